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

//! A single MQTT connection's protocol state machine. Sans-I/O: bytes
//! come in through [`ClientSession::incoming_byte`], replies that don't
//! need broker coordination (CONNACK, SUBACK, UNSUBACK, PINGRESP) are
//! written straight back to the session's own transport, and anything
//! that needs cross-session coordination (PUBLISH fan-out, SUBSCRIBE
//! forwarding) comes back out as an [`Event`] for the caller to act on.

use crate::mqtt::common::tracing::{trace, warn};
use crate::mqtt::common::HashSet;
use crate::mqtt::error::{ProtocolError, PublishError, SubscribeError, TransportError};
use crate::mqtt::interner::TopicId;
use crate::mqtt::packet::{Message, ParseOutcome, PacketType, Qos};
use crate::mqtt::connection::Role;
use crate::mqtt::topic;
use crate::mqtt::transport::Transport;
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Default client-side keep-alive, seconds. Matches `TINY_MQTT_DEFAULT_ALIVE`.
pub const DEFAULT_KEEP_ALIVE_SECS: u16 = 10;
/// Grace window a broker-managed session gets on top of its declared
/// keep-alive before being closed for inactivity.
pub const BROKER_GRACE_SECS: u64 = 5;
/// Window a freshly accepted (not yet CONNECTed) session has to send CONNECT.
pub const ACCEPT_GRACE_MS: u64 = 5_000;

/// Configuration for a [`ClientSession`] created directly (bridge or a
/// standalone point-to-point client, not broker-accepted).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub keep_alive_secs: u16,
    /// Presented in the outbound CONNECT's username field, if set — used
    /// when bridging to (or standalone-connecting to) a broker configured
    /// with credentials.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: "tinymqtt".to_string(),
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            username: None,
            password: None,
        }
    }
}

/// What a completed inbound packet requires the owner (broker or test
/// harness) to do beyond what the session already handled itself.
#[derive(Debug)]
pub enum Event {
    /// Nothing further needed; the session handled this packet entirely
    /// on its own (CONNACK reply, PINGRESP reply, accepted PUBACK, ...).
    None,
    /// A well-formed CONNECT was parsed but not yet accepted: the session
    /// holds no auth policy, so it carries the username/password bytes (if
    /// any) back to the broker. The broker must call either
    /// [`ClientSession::accept_connect`] (sends CONNACK, session becomes
    /// connected) or close the session (credential mismatch: CONNACK is
    /// never sent, matching "close silently").
    ConnectReceived {
        username: Option<Vec<u8>>,
        password: Option<Vec<u8>>,
    },
    /// Server-role session saw CONNACK-equivalent... unused for server role.
    /// Client-role session received CONNACK and should replay subscriptions.
    BridgeConnected,
    /// PUBLISH payload ready for the broker's fan-out.
    Publish { topic: String, payload: Vec<u8> },
    /// SUBSCRIBE accepted; filters already inserted into this session's own
    /// subscription set. The broker still needs to forward upstream if a
    /// bridge is live and this session isn't the bridge itself.
    Subscribed { filters: Vec<(String, Qos)> },
    /// UNSUBSCRIBE accepted; filters already removed.
    Unsubscribed { filters: Vec<String> },
    /// The session closed (protocol error, DISCONNECT, or transport error).
    Closed(ProtocolError),
}

/// One MQTT 3.1.1 connection: wire parser, subscription set, and
/// keep-alive bookkeeping. Used both for broker-accepted/bridge sessions
/// (own a [`Transport`]) and, inside [`crate::mqtt::Broker`], as the model
/// for bookkeeping a locally attached client (no transport).
pub struct ClientSession {
    role: Role,
    client_id: String,
    keep_alive_secs: u16,
    connected: bool,
    next_deadline_ms: u64,
    subscriptions: HashSet<TopicId>,
    parser: Message,
    transport: Option<Box<dyn Transport>>,
    /// Client-id/keep-alive parsed from an inbound CONNECT, staged until
    /// the broker calls [`ClientSession::accept_connect`].
    pending_connect: Option<(String, u16)>,
}

impl ClientSession {
    /// A session for a freshly accepted inbound TCP connection: server
    /// role, not yet connected, given the 5s accept grace.
    pub fn accepted(transport: Box<dyn Transport>, now_ms: u64) -> Self {
        Self {
            role: Role::Server,
            client_id: String::new(),
            keep_alive_secs: 0,
            connected: false,
            next_deadline_ms: now_ms + ACCEPT_GRACE_MS,
            subscriptions: HashSet::new(),
            parser: Message::new(),
            transport: Some(transport),
            pending_connect: None,
        }
    }

    /// A session that will initiate the connection (the bridge, or any
    /// standalone client talking to a remote broker): client role, sends
    /// CONNECT immediately.
    pub fn connecting(
        transport: Box<dyn Transport>,
        config: ClientConfig,
        now_ms: u64,
    ) -> Result<Self, TransportError> {
        let mut session = Self {
            role: Role::Client,
            client_id: config.client_id,
            keep_alive_secs: config.keep_alive_secs,
            connected: false,
            next_deadline_ms: now_ms,
            subscriptions: HashSet::new(),
            parser: Message::new(),
            transport: Some(transport),
            pending_connect: None,
        };
        session.send_connect(config.username.as_deref(), config.password.as_deref())?;
        session.refresh_deadline(now_ms);
        Ok(session)
    }

    /// A locally attached client with no transport: always connected.
    pub fn local(client_id: impl Into<String>) -> Self {
        Self {
            role: Role::Server,
            client_id: client_id.into(),
            keep_alive_secs: 0,
            connected: true,
            next_deadline_ms: u64::MAX,
            subscriptions: HashSet::new(),
            parser: Message::new(),
            transport: None,
            pending_connect: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn connected(&self) -> bool {
        self.connected && self.transport.as_ref().map(|t| t.connected()).unwrap_or(true)
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_subscribed_to(&self, filter_id: TopicId) -> bool {
        self.subscriptions.contains(&filter_id)
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = TopicId> + '_ {
        self.subscriptions.iter().copied()
    }

    fn refresh_deadline(&mut self, now_ms: u64) {
        if self.keep_alive_secs == 0 {
            self.next_deadline_ms = u64::MAX;
            return;
        }
        let grace = if self.role == Role::Server {
            BROKER_GRACE_SECS
        } else {
            0
        };
        self.next_deadline_ms = now_ms + u64::from(self.keep_alive_secs) * 1000 + grace * 1000;
    }

    fn send_connect(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), TransportError> {
        const FLAG_USERNAME: u8 = 0x80;
        const FLAG_PASSWORD: u8 = 0x40;
        let flags = (if username.is_some() { FLAG_USERNAME } else { 0 })
            | (if password.is_some() { FLAG_PASSWORD } else { 0 });

        let mut msg = Message::build(PacketType::Connect, 0);
        msg.add_lp_bytes(b"MQTT");
        msg.add_u8(4);
        msg.add_u8(flags);
        msg.add_u16(self.keep_alive_secs);
        msg.add_lp_bytes(self.client_id.as_bytes());
        if let Some(username) = username {
            msg.add_lp_bytes(username.as_bytes());
        }
        if let Some(password) = password {
            msg.add_lp_bytes(password.as_bytes());
        }
        msg.complete().map_err(|_| TransportError)?;
        self.write(msg.as_bytes())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        match &mut self.transport {
            Some(t) => t.write_all(bytes),
            None => Err(TransportError),
        }
    }

    /// Advance this session's timers. Returns `Some(event)` when keep-alive
    /// expiry requires action beyond what was done in place.
    pub fn check_keep_alive(&mut self, now_ms: u64) -> Event {
        if now_ms < self.next_deadline_ms {
            return Event::None;
        }
        match self.role {
            Role::Server => Event::Closed(ProtocolError::KeepAliveTimeout),
            Role::Client => {
                let mut ping = Message::build(PacketType::Pingreq, 0);
                let _ = ping.complete();
                if self.write(ping.as_bytes()).is_err() {
                    return Event::Closed(ProtocolError::TransportClosed);
                }
                self.refresh_deadline(now_ms);
                Event::None
            }
        }
    }

    /// Drain and dispatch every byte currently available on the
    /// transport, in order. Stops early on the first event the caller
    /// must react to (`Closed`, `Publish`, `Subscribed`, `Unsubscribed`,
    /// `BridgeConnected`) so ordering with the broker's own bookkeeping
    /// is preserved; call again to keep draining.
    pub fn pump(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(transport) = self.transport.as_mut() else {
            return events;
        };
        loop {
            if transport.available() == 0 {
                break;
            }
            let byte = transport.read_byte();
            match self.parser.incoming(byte) {
                ParseOutcome::Continue => continue,
                ParseOutcome::Error(reason) => {
                    warn!("framing error: {}", reason);
                    self.parser.reset();
                    events.push(Event::Closed(ProtocolError::MalformedLength));
                    self.connected = false;
                    return events;
                }
                ParseOutcome::Complete => {
                    let event = self.dispatch(now_ms);
                    self.parser.reset();
                    let close = matches!(event, Event::Closed(_));
                    events.push(event);
                    if close {
                        return events;
                    }
                    let transport = match self.transport.as_mut() {
                        Some(t) => t,
                        None => return events,
                    };
                    if !transport.connected() {
                        events.push(Event::Closed(ProtocolError::TransportClosed));
                        self.connected = false;
                        return events;
                    }
                    continue;
                }
            }
        }
        events
    }

    fn dispatch(&mut self, now_ms: u64) -> Event {
        let packet_type = match self.parser.packet_type() {
            Some(t) => t,
            None => return Event::Closed(ProtocolError::MalformedLength),
        };
        trace!("dispatch {}", packet_type);

        if !self.is_packet_legal(packet_type) {
            return Event::Closed(ProtocolError::UnexpectedPacket);
        }

        let body = self.parser.body().to_vec();
        let result = match packet_type {
            PacketType::Connect => self.on_connect(&body),
            PacketType::Connack => self.on_connack(),
            PacketType::Subscribe => self.on_subscribe(&body),
            PacketType::Unsubscribe => self.on_unsubscribe(&body),
            PacketType::Publish => self.on_publish(&body),
            PacketType::Suback | PacketType::Unsuback | PacketType::Puback => Ok(Event::None),
            PacketType::Pingreq => self.on_pingreq(),
            PacketType::Pingresp => Ok(Event::None),
            PacketType::Disconnect => {
                self.connected = false;
                return Event::Closed(ProtocolError::TransportClosed);
            }
        };

        match result {
            Ok(event) => {
                self.refresh_deadline(now_ms);
                event
            }
            Err(err) => {
                self.connected = false;
                Event::Closed(err)
            }
        }
    }

    fn is_packet_legal(&self, packet_type: PacketType) -> bool {
        use PacketType::*;
        match packet_type {
            Connect => self.role == Role::Server && !self.connected,
            Connack => self.role == Role::Client && !self.connected,
            Subscribe | Unsubscribe => self.role == Role::Server,
            Suback | Unsuback => self.role == Role::Client,
            Publish | Puback | Pingreq | Pingresp | Disconnect => true,
        }
    }

    fn on_connect(&mut self, body: &[u8]) -> Result<Event, ProtocolError> {
        let mut cur = crate::mqtt::common::Cursor::new(body);
        let proto = cur
            .read_lp_bytes()
            .ok_or(ProtocolError::BadProtocolName)?;
        if proto != b"MQTT" {
            return Err(ProtocolError::BadProtocolName);
        }
        let level = cur.read_u8().ok_or(ProtocolError::MalformedLength)?;
        if level != 4 {
            return Err(ProtocolError::UnsupportedProtocolLevel);
        }
        let flags = cur.read_u8().ok_or(ProtocolError::MalformedLength)?;
        let keep_alive = cur
            .read_u16()
            .ok_or(ProtocolError::MalformedLength)?;
        let client_id = cur
            .read_lp_bytes()
            .ok_or(ProtocolError::MalformedLength)?;

        const FLAG_USERNAME: u8 = 0x80;
        const FLAG_PASSWORD: u8 = 0x40;
        const FLAG_WILL: u8 = 0x04;

        if flags & FLAG_WILL != 0 {
            let _ = cur.read_lp_bytes();
            let _ = cur.read_lp_bytes();
        }

        let username = if flags & FLAG_USERNAME != 0 {
            Some(cur.read_lp_bytes().ok_or(ProtocolError::MalformedLength)?)
        } else {
            None
        };
        let password = if flags & FLAG_PASSWORD != 0 {
            Some(cur.read_lp_bytes().ok_or(ProtocolError::MalformedLength)?)
        } else {
            None
        };

        let client_id = String::from_utf8_lossy(client_id).into_owned();
        self.pending_connect = Some((client_id, keep_alive));

        Ok(Event::ConnectReceived {
            username: username.map(|b| b.to_vec()),
            password: password.map(|b| b.to_vec()),
        })
    }

    /// Broker accepted the pending CONNECT: apply the client-id/keep-alive,
    /// mark connected, and send CONNACK. Only valid right after a
    /// [`Event::ConnectReceived`].
    pub fn accept_connect(&mut self, now_ms: u64) -> Result<(), TransportError> {
        let (client_id, keep_alive) = self.pending_connect.take().unwrap_or_default();
        self.client_id = client_id;
        self.keep_alive_secs = keep_alive;
        self.connected = true;

        let mut connack = Message::build(PacketType::Connack, 0);
        connack.add_u8(0); // session-present = 0
        connack.add_u8(0); // return code = accepted
        let _ = connack.complete();
        self.write(connack.as_bytes())?;
        self.refresh_deadline(now_ms);
        Ok(())
    }

    /// Broker rejected the pending CONNECT (credential mismatch): no
    /// CONNACK is ever sent, matching "close silently". The caller still
    /// has to drop/close this session.
    pub fn reject_connect(&mut self) {
        self.pending_connect = None;
    }

    fn on_connack(&mut self) -> Result<Event, ProtocolError> {
        self.connected = true;
        Ok(Event::BridgeConnected)
    }

    fn on_subscribe(&mut self, body: &[u8]) -> Result<Event, ProtocolError> {
        let mut cur = crate::mqtt::common::Cursor::new(body);
        let packet_id = cur.read_u16().ok_or(ProtocolError::MalformedLength)?;

        let mut filters = Vec::new();
        let mut return_codes = Vec::new();
        while !cur.remaining_slice().is_empty() {
            let topic = cur
                .read_lp_bytes()
                .ok_or(ProtocolError::MalformedLength)?;
            let qos_byte = cur.read_u8().ok_or(ProtocolError::MalformedLength)?;
            let topic = String::from_utf8_lossy(topic).into_owned();
            let granted = qos_byte == 0 && topic::is_valid_filter(&topic);
            return_codes.push(if granted { 0x00 } else { 0x80 });
            if granted {
                filters.push((topic, Qos::AtMostOnce));
            }
        }

        let mut suback = Message::build(PacketType::Suback, 0);
        suback.add_u16(packet_id);
        for rc in &return_codes {
            suback.add_u8(*rc);
        }
        let _ = suback.complete();
        self.write(suback.as_bytes())
            .map_err(|_| ProtocolError::TransportClosed)?;

        Ok(Event::Subscribed { filters })
    }

    fn on_unsubscribe(&mut self, body: &[u8]) -> Result<Event, ProtocolError> {
        let mut cur = crate::mqtt::common::Cursor::new(body);
        let packet_id = cur.read_u16().ok_or(ProtocolError::MalformedLength)?;
        let mut filters = Vec::new();
        while !cur.remaining_slice().is_empty() {
            let topic = cur
                .read_lp_bytes()
                .ok_or(ProtocolError::MalformedLength)?;
            filters.push(String::from_utf8_lossy(topic).into_owned());
        }

        let mut unsuback = Message::build(PacketType::Unsuback, 0);
        unsuback.add_u16(packet_id);
        let _ = unsuback.complete();
        self.write(unsuback.as_bytes())
            .map_err(|_| ProtocolError::TransportClosed)?;

        Ok(Event::Unsubscribed { filters })
    }

    fn on_publish(&mut self, body: &[u8]) -> Result<Event, ProtocolError> {
        let mut cur = crate::mqtt::common::Cursor::new(body);
        let topic = cur
            .read_lp_bytes()
            .ok_or(ProtocolError::MalformedLength)?;
        let topic = String::from_utf8_lossy(topic).into_owned();

        let qos_bits = (self.parser.flags() >> 1) & 0x03;
        if qos_bits != 0 {
            let _ = cur.read_u16();
        }
        let payload = cur.remaining_slice().to_vec();
        Ok(Event::Publish { topic, payload })
    }

    fn on_pingreq(&mut self) -> Result<Event, ProtocolError> {
        let mut pingresp = Message::build(PacketType::Pingresp, 0);
        let _ = pingresp.complete();
        self.write(pingresp.as_bytes())
            .map_err(|_| ProtocolError::TransportClosed)?;
        Ok(Event::None)
    }

    /// Insert a filter into this session's own subscription set (the
    /// broker does this for a local client's `subscribe`, and for
    /// itself when replaying subscriptions after a bridge reconnects).
    pub fn insert_subscription(&mut self, filter_id: TopicId) {
        self.subscriptions.insert(filter_id);
    }

    pub fn remove_subscription(&mut self, filter_id: TopicId) {
        self.subscriptions.remove(&filter_id);
    }

    /// Send SUBSCRIBE upstream (bridge role only), one topic per call —
    /// outbound packet ids are always 0, this crate never tracks them.
    pub fn send_subscribe(&mut self, filters: &[(&str, Qos)]) -> Result<(), SubscribeError> {
        if filters.is_empty() {
            return Ok(());
        }
        let mut msg = Message::build(PacketType::Subscribe, 0x02);
        msg.add_u16(0);
        for (topic, qos) in filters {
            msg.add_lp_bytes(topic.as_bytes());
            msg.add_u8(*qos as u8);
        }
        let _ = msg.complete();
        self.write(msg.as_bytes()).map_err(|_| SubscribeError::NowhereToSend)
    }

    pub fn send_unsubscribe(&mut self, filters: &[&str]) -> Result<(), SubscribeError> {
        if filters.is_empty() {
            return Ok(());
        }
        let mut msg = Message::build(PacketType::Unsubscribe, 0x02);
        msg.add_u16(0);
        for topic in filters {
            msg.add_lp_bytes(topic.as_bytes());
        }
        let _ = msg.complete();
        self.write(msg.as_bytes()).map_err(|_| SubscribeError::NowhereToSend)
    }

    /// Deliver a PUBLISH to this session if its subscriptions match
    /// `topic` (writes on the transport; local sessions have none, so
    /// the broker invokes the callback separately for those).
    pub fn write_publish_if_subscribed(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> Result<bool, PublishError> {
        if self.transport.is_none() {
            return Ok(false);
        }
        let mut msg = Message::build(PacketType::Publish, 0);
        msg.add_lp_bytes(topic.as_bytes());
        msg.add_bytes(payload);
        msg.complete().map_err(|_| PublishError::InvalidMessage)?;
        self.write(msg.as_bytes())
            .map_err(|_| PublishError::NowhereToSend)?;
        Ok(true)
    }

    /// Build and write a standalone PUBLISH directly on this session's own
    /// transport (used for a bare point-to-point client with no broker).
    pub fn publish_direct(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if self.transport.is_none() {
            return Err(PublishError::NowhereToSend);
        }
        self.write_publish_if_subscribed(topic, payload).map(|_| ())
    }

    pub fn close(&mut self, send_disconnect: bool) {
        if send_disconnect {
            if let Some(t) = self.transport.as_mut() {
                if t.connected() {
                    let mut msg = Message::build(PacketType::Disconnect, 0);
                    let _ = msg.complete();
                    let _ = t.write_all(msg.as_bytes());
                }
            }
        }
        if let Some(t) = self.transport.as_mut() {
            t.stop();
        }
        self.connected = false;
    }
}
