//! Modified UTF-8 as used by `CONSTANT_Utf8_info`.
//!
//! It differs from standard UTF-8 in two ways: U+0000 is written as the two
//! bytes `0xC0 0x80`, and supplementary characters are written as a pair of
//! three-byte surrogate sequences instead of one four-byte sequence.

use std::borrow::Cow;

use cesu8::{from_java_cesu8, to_java_cesu8};

/// How malformed Utf8 payloads are handled while decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Utf8Mode {
    /// Malformed payloads are an error.
    #[default]
    Strict,
    /// Malformed sequences are replaced by U+FFFD.
    Lenient,
}

/// Decodes modified UTF-8. On failure returns the offset of the first
/// offending byte within `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Cow<'_, str>, usize> {
    // The two encodings the format forbids outright; cesu8 would accept the
    // first one through its plain UTF-8 fast path.
    if let Some(pos) = bytes.iter().position(|&b| b == 0 || b >= 0xf0) {
        return Err(pos);
    }

    from_java_cesu8(bytes).map_err(|_| first_malformed(bytes))
}

/// Decodes modified UTF-8, replacing every malformed sequence with U+FFFD.
///
/// The flag is set when at least one replacement happened.
pub fn decode_lossy(bytes: &[u8]) -> (Cow<'_, str>, bool) {
    if let Ok(s) = decode(bytes) {
        return (s, false);
    }

    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match sequence_at(bytes, i) {
            Some((c, len)) => {
                out.push(c);
                i += len;
            }
            None => {
                out.push(char::REPLACEMENT_CHARACTER);
                i += 1;
            }
        }
    }

    (Cow::Owned(out), true)
}

pub fn encode(s: &str) -> Cow<'_, [u8]> {
    to_java_cesu8(s)
}

fn first_malformed(bytes: &[u8]) -> usize {
    let mut i = 0;
    while i < bytes.len() {
        match sequence_at(bytes, i) {
            Some((_, len)) => i += len,
            None => return i,
        }
    }

    // Every sequence decoded on its own; the failure was at the end.
    bytes.len()
}

/// Decodes the single character starting at `i`, returning it with its
/// encoded length, or `None` if the bytes there are not valid modified UTF-8.
fn sequence_at(bytes: &[u8], i: usize) -> Option<(char, usize)> {
    let b0 = bytes[i];
    match b0 {
        0x01..=0x7f => Some((b0 as char, 1)),
        0xc0..=0xdf => {
            let b1 = continuation(bytes, i + 1)?;
            let cp = ((b0 as u32 & 0x1f) << 6) | b1;
            // Only the NUL form may be overlong.
            if cp < 0x80 && cp != 0 {
                return None;
            }
            char::from_u32(cp).map(|c| (c, 2))
        }
        0xe0..=0xef => {
            let cp = three_byte(bytes, i)?;
            match cp {
                0xd800..=0xdbff => {
                    let low = three_byte(bytes, i + 3)?;
                    if !(0xdc00..=0xdfff).contains(&low) {
                        return None;
                    }
                    let c = 0x10000 + ((cp - 0xd800) << 10) + (low - 0xdc00);
                    char::from_u32(c).map(|c| (c, 6))
                }
                0xdc00..=0xdfff => None,
                _ if cp < 0x800 => None,
                _ => char::from_u32(cp).map(|c| (c, 3)),
            }
        }
        _ => None,
    }
}

fn three_byte(bytes: &[u8], i: usize) -> Option<u32> {
    let b0 = *bytes.get(i)?;
    if !(0xe0..=0xef).contains(&b0) {
        return None;
    }
    let b1 = continuation(bytes, i + 1)?;
    let b2 = continuation(bytes, i + 2)?;

    Some(((b0 as u32 & 0x0f) << 12) | (b1 << 6) | b2)
}

fn continuation(bytes: &[u8], i: usize) -> Option<u32> {
    match bytes.get(i) {
        Some(&b) if b & 0xc0 == 0x80 => Some(b as u32 & 0x3f),
        _ => None,
    }
}



#[cfg(test)]
mod encode_tests {
    use super::*;

    #[test]
    fn it_should_encode_nul_as_two_bytes() {
        assert_eq!(&*encode("a\0"), &[b'a', 0xc0, 0x80]);
    }

    #[test]
    fn it_should_encode_supplementary_characters_as_surrogate_pairs() {
        assert_eq!(&*encode("\u{1F600}"), &[0xed, 0xa0, 0xbd, 0xed, 0xb8, 0x80]);
    }

    #[test]
    fn it_should_leave_ascii_untouched() {
        assert_eq!(&*encode("plain"), b"plain");
    }
}
