#![cfg_attr(not(feature = "std"), no_std)]

//! # tinymqtt
//!
//! A compact, Sans-I/O MQTT 3.1.1 core: a broker, an in-process local
//! client, and an upstream bridge, built to run on resource-constrained
//! nodes as well as on a full `std` host.
//!
//! This crate performs no I/O of its own. [`mqtt::ClientSession`] is a
//! pure packet parser and state machine driven by bytes the caller reads
//! off a [`mqtt::Transport`]; [`mqtt::Broker`] drives a whole fleet of
//! sessions (accepted network clients, transportless local clients, and
//! an optional bridge to an upstream broker) and turns matching
//! subscriptions into PUBLISH fan-out. Everything that needs the caller
//! to act — a newly accepted CONNECT awaiting credential approval, a
//! PUBLISH ready for fan-out, a session that closed — comes back out as
//! an [`mqtt::Event`], never as a side effect on a socket the crate
//! doesn't own.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tinymqtt::mqtt::transport::std_tcp::TcpListener;
//! use tinymqtt::mqtt::{Broker, BrokerConfig};
//!
//! let listener = TcpListener::bind("0.0.0.0:1883").unwrap();
//! let mut broker = Broker::new(listener, BrokerConfig::default());
//!
//! let local = broker.attach_local("dashboard");
//! broker.subscribe_local(local, "sensors/+/temp", tinymqtt::mqtt::packet::Qos::AtMostOnce).unwrap();
//!
//! loop {
//!     broker.tick(0 /* monotonic milliseconds */);
//!     for (topic, payload) in broker.drain_local_deliveries(local) {
//!         let _ = (topic, payload); // hand off to the rest of the app
//!     }
//! #   break;
//! }
//! ```
//!
//! ## QoS
//!
//! Only QoS 0 is implemented on the wire: no retries, no packet
//! identifiers, and a failed or short write just closes the session. See
//! [`mqtt::packet::Qos`].
//!
//! ## `no_std`
//!
//! Disable the default `std` feature to build for `no_std + alloc`
//! targets. [`mqtt::transport::std_tcp`] (the `std::net` backed
//! `Transport`/`Listener` pair) is only compiled with `std` enabled;
//! embedded callers supply their own [`mqtt::Transport`] impl instead.
//!
//! ## Logging
//!
//! Enable the `tracing` feature to route internal `trace`/`warn`
//! diagnostics through the `tracing` crate; with it disabled (the
//! default) those call sites compile to no-ops.

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

// Always use alloc types for consistency between std and no-std
#[macro_use]
extern crate alloc;

// Common prelude with alloc types
pub mod prelude {
    pub use alloc::{boxed::Box, format, string::String, vec, vec::Vec};

    #[cfg(feature = "std")]
    pub use std::io::IoSlice;
}

pub mod mqtt;
