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
use tinymqtt::mqtt::{ClientConfig, ClientSession, Event};

/// Scenario 5: a client with no other outgoing traffic sends a PINGREQ once
/// its keep-alive interval elapses, and the deadline refreshes on PINGRESP.
#[test]
fn idle_client_sends_pingreq_at_keep_alive_deadline() {
    let (mut peer, transport) = memory_pair();

    let mut client = ClientSession::connecting(
        Box::new(transport),
        ClientConfig {
            client_id: "idle".into(),
            keep_alive_secs: 2,
            ..Default::default()
        },
        0,
    )
    .unwrap();

    // Drain the CONNECT the constructor already sent.
    while peer.available() > 0 {
        peer.read_byte();
    }

    // Before the deadline, nothing happens.
    assert!(matches!(client.check_keep_alive(1_000), Event::None));
    assert_eq!(peer.available(), 0);

    // At the deadline, a bare two-byte PINGREQ goes out.
    assert!(matches!(client.check_keep_alive(2_000), Event::None));
    let mut ping = Vec::new();
    while peer.available() > 0 {
        ping.push(peer.read_byte());
    }
    assert_eq!(ping, vec![0xC0, 0x00]);

    // Simulate the broker's PINGRESP; the deadline refreshes from here.
    peer.write_all(&[0xD0, 0x00]).unwrap();
    let events = client.pump(2_000);
    assert!(matches!(events.as_slice(), [Event::None]));

    assert!(matches!(client.check_keep_alive(3_999), Event::None));
    assert_eq!(peer.available(), 0, "deadline should not have re-fired yet");
}
