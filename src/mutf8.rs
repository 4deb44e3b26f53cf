//! Modified UTF-8.
//!
//! Strings are encoded one UTF-16 code unit at a time: `U+0001..=U+007F`
//! take one byte, `U+0000` and `U+0080..=U+07FF` take two, everything else
//! takes three. Characters outside the Basic Multilingual Plane are encoded
//! as two three-byte surrogates, and the encoding never contains a zero
//! byte.

use crate::{Result, StreamError};

#[inline]
fn unit_len(unit: u16) -> usize {
    match unit {
        0x0001..=0x007f => 1,
        0x0000 | 0x0080..=0x07ff => 2,
        _ => 3,
    }
}

/// Number of bytes `s` occupies in modified UTF-8.
pub fn encoded_len(s: &str) -> usize {
    s.encode_utf16().map(unit_len).sum()
}

/// Encode `s` into a new buffer.
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(s));
    encode_into(s, &mut out);
    out
}

/// Append the encoding of `s` to `out`.
pub fn encode_into(s: &str, out: &mut Vec<u8>) {
    for unit in s.encode_utf16() {
        match unit_len(unit) {
            1 => out.push(unit as u8),
            2 => out.extend_from_slice(&[
                0xc0 | ((unit >> 6) & 0x1f) as u8,
                0x80 | (unit & 0x3f) as u8,
            ]),
            _ => out.extend_from_slice(&[
                0xe0 | ((unit >> 12) & 0x0f) as u8,
                0x80 | ((unit >> 6) & 0x3f) as u8,
                0x80 | (unit & 0x3f) as u8,
            ]),
        }
    }
}

fn malformed_at(index: usize) -> StreamError {
    StreamError::Malformed(format!("malformed input around byte {}", index))
}

#[inline]
fn is_continuation(byte: u8) -> bool {
    byte & 0xc0 == 0x80
}

/// Decode a complete modified UTF-8 byte sequence.
///
/// Fails with [`StreamError::Malformed`] on an invalid lead or continuation
/// byte, on a sequence cut short by the end of `bytes`, and on unpaired
/// surrogates.
pub fn decode(bytes: &[u8]) -> Result<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let lead = bytes[i];
        match lead >> 4 {
            0..=7 => {
                units.push(u16::from(lead));
                i += 1;
            }
            12 | 13 => {
                let seq = bytes
                    .get(i..i + 2)
                    .ok_or_else(|| StreamError::Malformed("partial character at end".into()))?;
                if !is_continuation(seq[1]) {
                    return Err(malformed_at(i + 1));
                }
                units.push((u16::from(lead & 0x1f) << 6) | u16::from(seq[1] & 0x3f));
                i += 2;
            }
            14 => {
                let seq = bytes
                    .get(i..i + 3)
                    .ok_or_else(|| StreamError::Malformed("partial character at end".into()))?;
                if !is_continuation(seq[1]) {
                    return Err(malformed_at(i + 1));
                }
                if !is_continuation(seq[2]) {
                    return Err(malformed_at(i + 2));
                }
                units.push(
                    (u16::from(lead & 0x0f) << 12)
                        | (u16::from(seq[1] & 0x3f) << 6)
                        | u16::from(seq[2] & 0x3f),
                );
                i += 3;
            }
            _ => return Err(malformed_at(i)),
        }
    }
    String::from_utf16(&units).map_err(|_| StreamError::Malformed("unpaired surrogate".into()))
}
