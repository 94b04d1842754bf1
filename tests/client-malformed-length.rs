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

mod common;

use common::memory_pair;
use tinymqtt::mqtt::transport::Transport;
use tinymqtt::mqtt::{ClientSession, Event, ProtocolError};

/// Scenario 6: a Remaining Length field with more than four continuation
/// bytes is a framing error, and the session closes rather than hanging
/// waiting for a fifth byte that never terminates the value.
#[test]
fn overlong_remaining_length_closes_the_session() {
    let (mut peer, transport) = memory_pair();
    let mut session = ClientSession::accepted(Box::new(transport), 0);

    peer.write_all(&[0x30, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]).unwrap();

    let events = session.pump(0);
    assert!(
        matches!(events.as_slice(), [Event::Closed(ProtocolError::MalformedLength)]),
        "expected a single MalformedLength close, got {events:?}"
    );
    assert!(!session.connected());
}
