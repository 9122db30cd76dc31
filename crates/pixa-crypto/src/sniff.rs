//! Media-type detection from leading bytes.
//!
//! Only the first [`SNIFF_LEN`] bytes are considered. Binary image formats are
//! recognised by exact magic-byte prefixes; SVG is recognised as markup after
//! an optional byte-order mark and leading whitespace. Anything else falls back
//! to `text/plain; charset=utf-8` (no binary control bytes) or
//! `application/octet-stream`.

/// Number of leading bytes inspected.
pub const SNIFF_LEN: usize = 512;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Exact-prefix signatures. A `None` byte matches anything.
const SIGNATURES: &[(&[Option<u8>], &str)] = &[
    (&[Some(0x00), Some(0x00), Some(0x01), Some(0x00)], "image/x-icon"),
    (&[Some(0x00), Some(0x00), Some(0x02), Some(0x00)], "image/x-icon"),
    (&[Some(b'B'), Some(b'M')], "image/bmp"),
    (&[Some(b'G'), Some(b'I'), Some(b'F'), Some(b'8'), Some(b'7'), Some(b'a')], "image/gif"),
    (&[Some(b'G'), Some(b'I'), Some(b'F'), Some(b'8'), Some(b'9'), Some(b'a')], "image/gif"),
    (
        &[
            Some(0x89), Some(b'P'), Some(b'N'), Some(b'G'),
            Some(0x0D), Some(0x0A), Some(0x1A), Some(0x0A),
        ],
        "image/png",
    ),
    (&[Some(0xFF), Some(0xD8), Some(0xFF)], "image/jpeg"),
    (
        &[
            Some(b'R'), Some(b'I'), Some(b'F'), Some(b'F'),
            None, None, None, None,
            Some(b'W'), Some(b'E'), Some(b'B'), Some(b'P'), Some(b'V'), Some(b'P'),
        ],
        "image/webp",
    ),
    (&[Some(b'I'), Some(b'I'), Some(0x2A), Some(0x00)], "image/tiff"),
    (&[Some(b'M'), Some(b'M'), Some(0x00), Some(0x2A)], "image/tiff"),
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Detect the media type of `data` from its content alone.
pub fn sniff(data: &[u8]) -> &'static str {
    let head = &data[..data.len().min(SNIFF_LEN)];

    for &(pattern, media_type) in SIGNATURES {
        if matches_prefix(head, pattern) {
            return media_type;
        }
    }

    let markup = trim_leading_whitespace(head.strip_prefix(UTF8_BOM).unwrap_or(head));
    if starts_with_ignore_case(markup, b"<svg") {
        return "image/svg+xml";
    }
    if starts_with_ignore_case(markup, b"<?xml") && contains_ignore_case(markup, b"<svg") {
        return "image/svg+xml";
    }

    if head.iter().any(|&b| is_binary_byte(b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

fn matches_prefix(data: &[u8], pattern: &[Option<u8>]) -> bool {
    data.len() >= pattern.len()
        && pattern
            .iter()
            .zip(data)
            .all(|(p, b)| p.map_or(true, |p| p == *b))
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn starts_with_ignore_case(data: &[u8], prefix: &[u8]) -> bool {
    data.len() >= prefix.len() && data[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn contains_ignore_case(data: &[u8], needle: &[u8]) -> bool {
    data.windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
