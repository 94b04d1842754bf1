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

//! Incremental MQTT control packet framer.
//!
//! One [`Message`] is both the inbound byte-at-a-time parser and the
//! outbound packet builder: the same growable buffer backs both
//! directions, just as a fresh packet being built shares the same shape
//! as one being parsed off the wire.

use super::packet_type::PacketType;
use crate::mqtt::common::tracing::trace;
use alloc::vec::Vec;

/// Hard cap on a single control packet, header included. Not a protocol
/// limit — Remaining Length can encode up to `0x0FFF_FFFF` — but the
/// implementation-defined ceiling this crate enforces while streaming
/// a packet in.
pub const MAX_BUFFER_LENGTH: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    FixedHeader,
    Length,
    Payload,
    Complete,
    Error,
    /// Outbound packet under construction via `add_*`/`complete`.
    Building,
}

/// Result of feeding one byte to [`Message::incoming`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// More bytes are needed.
    Continue,
    /// The packet is fully assembled; `message.as_bytes()` is valid.
    Complete,
    /// Malformed length or packet too large; the message was reset.
    Error(&'static str),
}

/// A single MQTT control packet, either being parsed in or built for
/// output.
pub struct Message {
    buffer: Vec<u8>,
    /// Offset of the first variable-header byte.
    vheader: usize,
    /// While parsing: bytes of payload still expected. While decoding
    /// the length itself: accumulated value so far.
    remaining: u32,
    multiplier: u32,
    continuation_bytes: u8,
    state: ParseState,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    /// A fresh parser, ready to receive fixed-header bytes via `incoming`.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            vheader: 0,
            remaining: 0,
            multiplier: 1,
            continuation_bytes: 0,
            state: ParseState::FixedHeader,
        }
    }

    /// Start building an outbound packet: stashes the type|flags byte
    /// and reserves two placeholder length bytes.
    pub fn build(packet_type: PacketType, flags: u8) -> Self {
        let mut buffer = Vec::with_capacity(16);
        buffer.push((packet_type.header_nibble() << 4) | (flags & 0x0F));
        buffer.push(0);
        buffer.push(0);
        Self {
            buffer,
            vheader: 3,
            remaining: 0,
            multiplier: 1,
            continuation_bytes: 0,
            state: ParseState::Building,
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.vheader = 0;
        self.remaining = 0;
        self.multiplier = 1;
        self.continuation_bytes = 0;
        self.state = ParseState::FixedHeader;
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Feed one incoming byte through the framer state machine.
    pub fn incoming(&mut self, byte: u8) -> ParseOutcome {
        match self.state {
            ParseState::FixedHeader => {
                self.buffer.push(byte);
                self.state = ParseState::Length;
                self.remaining = 0;
                self.multiplier = 1;
                self.continuation_bytes = 0;
                ParseOutcome::Continue
            }
            ParseState::Length => {
                self.continuation_bytes += 1;
                if self.continuation_bytes > 4 {
                    return self.fail("remaining length: too many continuation bytes");
                }
                self.buffer.push(byte);
                self.remaining = self
                    .remaining
                    .saturating_add(u32::from(byte & 0x7F) * self.multiplier);
                if self.remaining as usize + self.buffer.len() > MAX_BUFFER_LENGTH {
                    return self.fail("remaining length exceeds the buffer cap");
                }
                self.multiplier = self.multiplier.saturating_mul(128);

                if byte & 0x80 == 0 {
                    self.vheader = self.buffer.len();
                    if self.remaining == 0 {
                        self.state = ParseState::Complete;
                        trace!("message complete with empty payload");
                        ParseOutcome::Complete
                    } else {
                        self.buffer
                            .reserve(self.remaining as usize);
                        self.state = ParseState::Payload;
                        ParseOutcome::Continue
                    }
                } else {
                    ParseOutcome::Continue
                }
            }
            ParseState::Payload => {
                self.buffer.push(byte);
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.state = ParseState::Complete;
                    ParseOutcome::Complete
                } else {
                    ParseOutcome::Continue
                }
            }
            ParseState::Complete | ParseState::Error | ParseState::Building => {
                self.fail("byte received while not parsing")
            }
        }
    }

    fn fail(&mut self, reason: &'static str) -> ParseOutcome {
        self.state = ParseState::Error;
        self.buffer.clear();
        ParseOutcome::Error(reason)
    }

    /// The packet type, valid once `state() == Complete`.
    pub fn packet_type(&self) -> Option<PacketType> {
        if self.state != ParseState::Complete {
            return None;
        }
        PacketType::from_header_byte(self.buffer[0]).ok()
    }

    pub fn flags(&self) -> u8 {
        self.buffer.first().copied().unwrap_or(0) & 0x0F
    }

    /// The variable-header + payload bytes.
    pub fn body(&self) -> &[u8] {
        &self.buffer[self.vheader.min(self.buffer.len())..]
    }

    /// The full serialized packet (fixed header included).
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    // --- outbound builder helpers ---

    pub fn add_u8(&mut self, byte: u8) -> &mut Self {
        self.buffer.push(byte);
        self
    }

    pub fn add_u16(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    /// Append a length-prefixed string/byte string (2-byte big-endian
    /// length followed by the bytes).
    pub fn add_lp_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.add_u16(bytes.len() as u16);
        self.add_bytes(bytes)
    }

    /// Finalize an outbound packet: encode the true Remaining Length,
    /// compacting the two reserved placeholder bytes to however many
    /// the value actually needs.
    pub fn complete(&mut self) -> Result<(), &'static str> {
        debug_assert_eq!(self.state, ParseState::Building);
        let remaining_len = self.buffer.len() - 3;
        if remaining_len + 5 > MAX_BUFFER_LENGTH {
            return Err("packet exceeds the buffer cap");
        }

        let vbi = super::variable_byte_integer::VariableByteInteger::from_u32(remaining_len as u32)
            .ok_or("remaining length too large to encode")?;
        let encoded = vbi.as_bytes();

        let type_byte = self.buffer[0];
        let body: Vec<u8> = self.buffer.split_off(3);
        self.buffer.clear();
        self.buffer.push(type_byte);
        self.buffer.extend_from_slice(encoded);
        self.buffer.extend_from_slice(&body);
        self.vheader = 1 + encoded.len();
        self.state = ParseState::Complete;
        Ok(())
    }
}
