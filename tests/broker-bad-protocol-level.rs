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

use common::{memory_pair, QueueListener};
use tinymqtt::mqtt::packet::{Message, PacketType};
use tinymqtt::mqtt::transport::Transport;
use tinymqtt::mqtt::{Broker, BrokerConfig};

/// Scenario 4: a CONNECT declaring a protocol level other than 4 (3.1.1) is
/// closed without ever getting a CONNACK, and the session is gone.
#[test]
fn unsupported_protocol_level_closes_without_a_connack() {
    let mut listener = QueueListener::new();
    let (server_end, mut client_end) = memory_pair();
    listener.push(server_end);

    let mut broker = Broker::new(listener, BrokerConfig::default());

    let mut connect = Message::build(PacketType::Connect, 0);
    connect.add_lp_bytes(b"MQTT");
    connect.add_u8(5); // bogus protocol level
    connect.add_u8(0);
    connect.add_u16(0);
    connect.add_lp_bytes(b"bad-level");
    connect.complete().unwrap();
    client_end.write_all(connect.as_bytes()).unwrap();

    broker.tick(0);

    assert_eq!(broker.clients_count(), 0);
    assert_eq!(client_end.available(), 0, "no CONNACK should have been sent");
}
