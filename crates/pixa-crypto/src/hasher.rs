use pixa_types::Fingerprint;

/// BLAKE3 content hasher producing asset fingerprints.
///
/// Fingerprints are plain digests with no domain tag, so any external BLAKE3
/// tool (`b3sum`) run over a downloaded asset reproduces the stored value.
pub struct ContentHasher;

impl ContentHasher {
    /// Fingerprint an in-memory byte sequence.
    pub fn fingerprint(data: &[u8]) -> Fingerprint {
        Fingerprint::from_digest(*blake3::hash(data).as_bytes())
    }
}

/// Incremental fingerprinting over data that arrives in chunks.
///
/// Feeding the same bytes in any chunking yields the same fingerprint as
/// [`ContentHasher::fingerprint`] over the concatenation.
#[derive(Default)]
pub struct FingerprintWriter {
    hasher: blake3::Hasher,
    written: u64,
}

impl FingerprintWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb the next chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.written += chunk.len() as u64;
    }

    /// Bytes absorbed so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn finalize(&self) -> Fingerprint {
        Fingerprint::from_digest(*self.hasher.finalize().as_bytes())
    }
}

impl std::io::Write for FingerprintWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = ContentHasher::fingerprint(b"hello world");
        let b = ContentHasher::fingerprint(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_different_fingerprint() {
        assert_ne!(
            ContentHasher::fingerprint(b"aaa"),
            ContentHasher::fingerprint(b"aab")
        );
    }

    #[test]
    fn matches_reference_blake3_vector() {
        // BLAKE3 of the empty input.
        let fp = ContentHasher::fingerprint(b"");
        assert_eq!(
            fp.to_hex(),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn io_write_feeds_the_hasher() {
        use std::io::Write;
        let mut w = FingerprintWriter::new();
        w.write_all(b"stream").unwrap();
        w.flush().unwrap();
        assert_eq!(w.bytes_written(), 6);
        assert_eq!(w.finalize(), ContentHasher::fingerprint(b"stream"));
    }

    proptest! {
        #[test]
        fn chunked_equals_one_shot(data in proptest::collection::vec(any::<u8>(), 0..4096), split in 0usize..4096) {
            let split = split.min(data.len());
            let mut w = FingerprintWriter::new();
            w.update(&data[..split]);
            w.update(&data[split..]);
            prop_assert_eq!(w.finalize(), ContentHasher::fingerprint(&data));
            prop_assert_eq!(w.bytes_written(), data.len() as u64);
        }
    }
}
