use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use pixa_blob::BlobReader;
use tokio::io::{AsyncRead, ReadBuf};

/// Streaming read handle on an asset's bytes.
///
/// Returned together with the asset's record so callers can check length and
/// media type without a second lookup. The underlying blob handle is released
/// when the stream is dropped, on every exit path.
pub struct AssetStream {
    inner: BlobReader,
    expected_len: u64,
    read: u64,
}

impl AssetStream {
    pub(crate) fn new(inner: BlobReader, expected_len: u64) -> Self {
        Self {
            inner,
            expected_len,
            read: 0,
        }
    }

    /// Size recorded in the catalog for this asset.
    pub fn expected_len(&self) -> u64 {
        self.expected_len
    }

    /// Bytes read from the stream so far.
    pub fn bytes_read(&self) -> u64 {
        self.read
    }
}

impl AsyncRead for AssetStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            this.read += (buf.filled().len() - before) as u64;
        }
        poll
    }
}

impl std::fmt::Debug for AssetStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStream")
            .field("expected_len", &self.expected_len)
            .field("read", &self.read)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn counts_bytes_read() {
        let mut stream = AssetStream::new(Box::new(io::Cursor::new(b"abcdef".to_vec())), 6);
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"abcdef");
        assert_eq!(stream.bytes_read(), 6);
        assert_eq!(stream.expected_len(), 6);
    }
}
