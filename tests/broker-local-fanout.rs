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

use common::QueueListener;
use tinymqtt::mqtt::packet::Qos;
use tinymqtt::mqtt::{Broker, BrokerConfig};

#[test]
fn two_local_clients_fan_out_through_wildcard_subscription() {
    let mut broker = Broker::new(QueueListener::new(), BrokerConfig::default());

    let a = broker.attach_local("A");
    let b = broker.attach_local("B");

    broker
        .subscribe_local(a, "room/+/temp", Qos::AtMostOnce)
        .unwrap();

    broker
        .publish_local(b, "room/kitchen/temp", b"21")
        .unwrap();

    let deliveries = broker.drain_local_deliveries(a);
    assert_eq!(deliveries, vec![("room/kitchen/temp".to_string(), b"21".to_vec())]);
    assert!(broker.drain_local_deliveries(b).is_empty());
}

#[test]
fn non_matching_topic_does_not_deliver() {
    let mut broker = Broker::new(QueueListener::new(), BrokerConfig::default());
    let a = broker.attach_local("A");
    let b = broker.attach_local("B");

    broker.subscribe_local(a, "room/kitchen/temp", Qos::AtMostOnce).unwrap();
    broker.publish_local(b, "room/lounge/temp", b"19").unwrap();

    assert!(broker.drain_local_deliveries(a).is_empty());
}

#[test]
fn unsubscribe_stops_further_delivery() {
    let mut broker = Broker::new(QueueListener::new(), BrokerConfig::default());
    let a = broker.attach_local("A");
    let b = broker.attach_local("B");

    broker.subscribe_local(a, "x", Qos::AtMostOnce).unwrap();
    broker.unsubscribe_local(a, "x").unwrap();
    broker.publish_local(b, "x", b"v").unwrap();

    assert!(broker.drain_local_deliveries(a).is_empty());
}
