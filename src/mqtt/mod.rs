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

//! TinyMqtt protocol core: packet codec, topic matching, client session
//! state machine and broker fan-out, all Sans-I/O.

pub mod common;
pub mod connection;
pub mod error;
pub mod interner;
pub mod packet;
pub mod topic;
pub mod transport;

mod broker;
mod client;

pub use broker::{Broker, BridgeState, BrokerConfig, LocalId};
pub use client::{ClientConfig, ClientSession, Event};
pub use connection::Role;
pub use error::{ProtocolError, PublishError, SubscribeError, TransportError};
pub use interner::{InternerFull, StringInterner, TopicId};
pub use packet::{Message, PacketType};
pub use transport::{Listener, Transport};
