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
use tinymqtt::mqtt::packet::{Message, PacketType, ParseOutcome};
use tinymqtt::mqtt::transport::Transport;
use tinymqtt::mqtt::{Broker, BrokerConfig, ClientConfig};

/// Reads exactly one full packet off `transport` and returns it, panicking
/// if nothing is available.
fn read_one(transport: &mut impl Transport) -> Message {
    let mut msg = Message::new();
    loop {
        assert!(transport.available() > 0, "expected a packet, got none");
        let byte = transport.read_byte();
        match msg.incoming(byte) {
            ParseOutcome::Complete => return msg,
            ParseOutcome::Continue => continue,
            ParseOutcome::Error(reason) => panic!("framing error: {reason}"),
        }
    }
}

/// Scenario 3 from the spec: a local subscribe gets forwarded upstream via
/// the bridge, and an upstream publish fans out to the matching local
/// client without being echoed back upstream.
#[test]
fn local_subscribe_forwards_upstream_and_upstream_publish_fans_out_locally() {
    use tinymqtt::mqtt::packet::Qos;

    let (mut upstream_end, bridge_transport) = memory_pair();

    let mut broker = Broker::new(common::QueueListener::new(), BrokerConfig::default());
    broker
        .connect_bridge(
            Box::new(bridge_transport),
            ClientConfig {
                client_id: "bridge".into(),
                ..Default::default()
            },
            0,
        )
        .unwrap();

    // Drain the CONNECT the bridge just sent, then answer with CONNACK.
    let connect = read_one(&mut upstream_end);
    assert_eq!(connect.packet_type(), Some(PacketType::Connect));

    let mut connack = Message::build(PacketType::Connack, 0);
    connack.add_u8(0);
    connack.add_u8(0);
    connack.complete().unwrap();
    upstream_end.write_all(connack.as_bytes()).unwrap();

    broker.tick(0);
    assert_eq!(broker.bridge_state(), tinymqtt::mqtt::BridgeState::Connected);

    let local = broker.attach_local("L");
    broker.subscribe_local(local, "a/#", Qos::AtMostOnce).unwrap();

    let subscribe = read_one(&mut upstream_end);
    assert_eq!(subscribe.packet_type(), Some(PacketType::Subscribe));
    assert!(upstream_end.available() == 0);

    let mut publish = Message::build(PacketType::Publish, 0);
    publish.add_lp_bytes(b"a/b");
    publish.add_bytes(b"1");
    publish.complete().unwrap();
    upstream_end.write_all(publish.as_bytes()).unwrap();

    broker.tick(0);

    let deliveries = broker.drain_local_deliveries(local);
    assert_eq!(deliveries, vec![("a/b".to_string(), b"1".to_vec())]);

    // No echo: the bridge must not have written anything back upstream.
    assert_eq!(upstream_end.available(), 0);
}
