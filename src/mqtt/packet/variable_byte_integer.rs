/**
 * MIT License
 *
 * Copyright (c) 2025 Takatoshi Kondo
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */
use arrayvec::ArrayVec;
use core::convert::TryFrom;
use core::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// MQTT "Remaining Length" variable byte integer: 1-4 bytes, 7 data bits
/// per byte, high bit set on every byte but the last.
///
/// The codec uses this type for the full protocol range
/// (`0..=0x0FFF_FFFF`); [`crate::mqtt::packet::Message`] separately
/// enforces the crate's 4096-byte implementation cap while streaming a
/// packet in, so a round-trip through `VariableByteInteger` alone does not
/// imply an accepted packet size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableByteInteger {
    encoded: ArrayVec<u8, 4>,
}

impl VariableByteInteger {
    pub const MAX: u32 = 0x0FFF_FFFF;

    /// Encode a `u32` into 1-4 bytes, return `None` if too large.
    pub fn from_u32(mut value: u32) -> Option<Self> {
        if value > Self::MAX {
            return None;
        }
        let mut buf = ArrayVec::<u8, 4>::new();
        loop {
            let mut byte = (value % 128) as u8;
            value /= 128;
            if value > 0 {
                byte |= 0x80;
            }
            buf.push(byte);
            if value == 0 {
                break;
            }
        }
        Some(Self { encoded: buf })
    }

    pub fn to_u32(&self) -> u32 {
        let mut multiplier = 1u32;
        let mut result = 0u32;
        for &b in &*self.encoded {
            result += u32::from(b & 0x7F) * multiplier;
            multiplier = multiplier.saturating_mul(128);
        }
        result
    }

    pub fn size(&self) -> usize {
        self.encoded.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Streaming decode: `Ok(vbi, consumed)` once the continuation bit
    /// clears, `Incomplete` if `buf` might still grow into a valid
    /// encoding, `Err` on a malformed (too many continuation bytes or
    /// overflowing) encoding.
    pub fn decode_stream(buf: &[u8]) -> DecodeResult<Self> {
        let mut multiplier = 1u32;
        let mut value = 0u32;

        for (i, &b) in buf.iter().take(4).enumerate() {
            value = value
                .checked_add(u32::from(b & 0x7F) * multiplier)
                .unwrap_or(u32::MAX);
            if value > Self::MAX {
                return DecodeResult::Err("variable byte integer too large");
            }

            if (b & 0x80) == 0 {
                return match Self::from_u32(value) {
                    Some(vbi) => DecodeResult::Ok(vbi, i + 1),
                    None => DecodeResult::Err("encoding failure"),
                };
            }
            multiplier = multiplier.checked_mul(128).unwrap_or(0);
        }

        if buf.len() < 4 {
            DecodeResult::Incomplete
        } else {
            DecodeResult::Err("malformed variable byte integer: too many continuation bytes")
        }
    }
}

/// Result of [`VariableByteInteger::decode_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeResult<T> {
    Ok(T, usize),
    Incomplete,
    Err(&'static str),
}

impl Serialize for VariableByteInteger {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.to_u32())
    }
}

impl<'de> Deserialize<'de> for VariableByteInteger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let val = u32::deserialize(deserializer)?;
        VariableByteInteger::from_u32(val).ok_or_else(|| serde::de::Error::custom("value too large"))
    }
}

impl fmt::Display for VariableByteInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u32())
    }
}

impl From<VariableByteInteger> for u32 {
    fn from(vbi: VariableByteInteger) -> Self {
        vbi.to_u32()
    }
}

impl TryFrom<u32> for VariableByteInteger {
    type Error = &'static str;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        VariableByteInteger::from_u32(value).ok_or("value too large")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_boundary_values() {
        for &v in &[0u32, 1, 127, 128, 16383, 16384, 2097151, 2097152, 4096] {
            let vbi = VariableByteInteger::from_u32(v).unwrap();
            assert_eq!(vbi.to_u32(), v);
            match VariableByteInteger::decode_stream(vbi.as_bytes()) {
                DecodeResult::Ok(decoded, consumed) => {
                    assert_eq!(consumed, vbi.size());
                    assert_eq!(decoded.to_u32(), v);
                }
                other => panic!("expected Ok for {v}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_five_continuation_bytes() {
        let malformed = [0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        assert!(matches!(
            VariableByteInteger::decode_stream(&malformed),
            DecodeResult::Err(_)
        ));
    }

    #[test]
    fn reports_incomplete_when_still_continuing() {
        assert_eq!(
            VariableByteInteger::decode_stream(&[0x80, 0x80]),
            DecodeResult::Incomplete
        );
    }
}
