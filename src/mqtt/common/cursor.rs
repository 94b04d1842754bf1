// MIT License
//
// Copyright (c) 2025 Takatoshi Kondo
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

/// A read-only cursor over an in-memory byte slice.
///
/// Used by the packet decoders to walk the variable header and payload of a
/// completed [`crate::mqtt::packet::Message`] without copying. Unlike
/// `std::io::Cursor` this is `no_std`-friendly and only supports reading.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    inner: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    #[inline]
    pub fn new(inner: &'a [u8]) -> Self {
        Cursor { inner, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// All bytes from the current position to the end.
    #[inline]
    pub fn remaining_slice(&self) -> &'a [u8] {
        if self.pos <= self.inner.len() {
            &self.inner[self.pos..]
        } else {
            &[]
        }
    }

    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let b = *self.inner.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    /// Big-endian u16, as used by every length-prefixed MQTT string/binary field.
    #[inline]
    pub fn read_u16(&mut self) -> Option<u16> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Option<&'a [u8]> {
        if self.pos.saturating_add(count) <= self.inner.len() {
            let data = &self.inner[self.pos..self.pos + count];
            self.pos += count;
            Some(data)
        } else {
            None
        }
    }

    /// Reads a two-byte-length-prefixed MQTT string/binary field.
    #[inline]
    pub fn read_lp_bytes(&mut self) -> Option<&'a [u8]> {
        let len = self.read_u16()? as usize;
        self.read_bytes(len)
    }

    #[inline]
    pub fn skip(&mut self, count: usize) -> Option<()> {
        if self.pos.saturating_add(count) <= self.inner.len() {
            self.pos += count;
            Some(())
        } else {
            None
        }
    }
}
