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
use tinymqtt::mqtt::packet::Qos;
use tinymqtt::mqtt::{Broker, BrokerConfig, ClientConfig, ClientSession, Event};

/// Scenario 2 from the spec: a network client N connects, subscribes, and a
/// local client's publish is written as a wire PUBLISH on N's transport.
#[test]
fn network_client_receives_wire_publish_for_local_publish() {
    let mut listener = QueueListener::new();
    let (server_end, client_end) = memory_pair();
    listener.push(server_end);

    let mut broker = Broker::new(listener, BrokerConfig::default());

    let mut n = ClientSession::connecting(
        Box::new(client_end),
        ClientConfig {
            client_id: "N".into(),
            ..Default::default()
        },
        0,
    )
    .unwrap();

    // Broker accepts the transport and processes CONNECT -> CONNACK.
    broker.tick(0);
    let events = n.pump(0);
    assert!(matches!(events.as_slice(), [Event::BridgeConnected]));

    n.send_subscribe(&[("x", Qos::AtMostOnce)]).unwrap();
    broker.tick(0);
    let events = n.pump(0);
    assert!(matches!(events.as_slice(), [Event::None]));

    let local = broker.attach_local("L");
    broker.publish_local(local, "x", b"v").unwrap();

    let events = n.pump(0);
    match events.as_slice() {
        [Event::Publish { topic, payload }] => {
            assert_eq!(topic, "x");
            assert_eq!(payload, b"v");
        }
        other => panic!("expected a single Publish event, got {other:?}"),
    }

    assert_eq!(broker.clients_count(), 1);
}
