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

use core::fmt;

/// Outcome of [`crate::mqtt::ClientSession::publish`].
///
/// `Ok(())` mirrors the original `MqttOk`; the two failure cases are the
/// only ones the core ever produces, matching the three-way `MqttError`
/// enum of the source implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Neither a local broker nor a remote transport is attached.
    NowhereToSend,
    /// The outbound packet could not be assembled (empty/oversized buffer).
    InvalidMessage,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NowhereToSend => "nowhere to send: no broker or transport attached",
            Self::InvalidMessage => "invalid message: nothing to send",
        };
        write!(f, "{s}")
    }
}

/// Outcome of [`crate::mqtt::ClientSession::subscribe`] /
/// [`crate::mqtt::ClientSession::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeError {
    /// Neither a local broker nor a remote transport is attached.
    NowhereToSend,
}

impl fmt::Display for SubscribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nowhere to send: no broker or transport attached")
    }
}

/// Internal reasons a session is closed. Never returned from a public
/// method — a close just happens and the session reports `connected() ==
/// false` on the next `loop()`. Kept as a type (rather than just a log
/// line) so tests can assert *why* a session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// CONNECT had a protocol name other than "MQTT".
    BadProtocolName,
    /// CONNECT declared a protocol level other than 4 (3.1.1).
    UnsupportedProtocolLevel,
    /// Username or password did not match the broker's configured credentials.
    CredentialMismatch,
    /// Remaining Length used more than 4 continuation bytes, or exceeded
    /// the 4096-byte implementation cap.
    MalformedLength,
    /// A packet type is not legal for the session's current state/role
    /// (e.g. a second CONNECT, or CONNECT received by a client-role session).
    UnexpectedPacket,
    /// The accept-grace or keep-alive deadline passed with no qualifying
    /// traffic.
    KeepAliveTimeout,
    /// The underlying transport reported a disconnect or a short write.
    TransportClosed,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BadProtocolName => "bad protocol name in CONNECT",
            Self::UnsupportedProtocolLevel => "unsupported protocol level in CONNECT",
            Self::CredentialMismatch => "username/password did not match",
            Self::MalformedLength => "malformed or oversized remaining length",
            Self::UnexpectedPacket => "unexpected packet for current state",
            Self::KeepAliveTimeout => "keep-alive deadline exceeded",
            Self::TransportClosed => "transport closed or write failed",
        };
        write!(f, "{s}")
    }
}

/// Returned by [`crate::mqtt::Transport::write_all`] on a short or failed
/// write. The core treats this the same as a protocol error: QoS 0 offers
/// no retry, so the owning session is simply closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportError;

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport write failed")
    }
}
