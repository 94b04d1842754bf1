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

//! The broker: owns accepted sessions, local (in-process, transportless)
//! clients, the topic interner, and the optional upstream bridge. Nothing
//! here performs I/O beyond what [`ClientSession`] already does through its
//! [`Transport`] — `tick` just drives the accept loop and every session's
//! own `pump`, then reacts to whatever [`Event`]s come back.

use crate::mqtt::client::{ClientConfig, ClientSession, Event};
use crate::mqtt::error::{PublishError, SubscribeError};
use crate::mqtt::interner::StringInterner;
use crate::mqtt::packet::Qos;
use crate::mqtt::topic;
use crate::mqtt::transport::{Listener, Transport};
use crate::mqtt::common::tracing::{trace, warn};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

/// Broker-wide configuration: optional credentials and the upstream bridge
/// target, if any.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Non-empty to require a matching username on every CONNECT.
    pub username: Option<String>,
    /// Non-empty to require a matching password on every CONNECT.
    pub password: Option<String>,
}

impl Default for BrokerConfig {
    /// Matches the default `guest`/`guest` credentials.
    fn default() -> Self {
        Self {
            username: Some(String::from("guest")),
            password: Some(String::from("guest")),
        }
    }
}

/// Bridge connection lifecycle, mirroring spec.md's
/// `Disconnected -> Connecting -> Connected -> Disconnected` state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Disconnected,
    Connecting,
    Connected,
}

/// Opaque handle to a local (in-process, transportless) client attached to
/// a broker. Stable for the lifetime of the attachment; reused once the
/// slot is freed, just like topic-id reuse in the interner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalId(usize);

struct LocalEntry {
    session: ClientSession,
    /// PUBLISHes matched to this local client, staged until the caller
    /// drains them — a local session has no transport to write to.
    deliveries: Vec<(String, Vec<u8>)>,
}

/// A single MQTT broker: accepts connections via `L`, fans PUBLISH out to
/// matching subscribers, and optionally bridges to an upstream broker.
pub struct Broker<L: Listener> {
    listener: L,
    config: BrokerConfig,
    interner: StringInterner,
    accepted: Vec<ClientSession>,
    locals: Vec<Option<LocalEntry>>,
    bridge: Option<ClientSession>,
    bridge_state: BridgeState,
}

impl<L: Listener> Broker<L> {
    pub fn new(listener: L, config: BrokerConfig) -> Self {
        Self {
            listener,
            config,
            interner: StringInterner::new(),
            accepted: Vec::new(),
            locals: Vec::new(),
            bridge: None,
            bridge_state: BridgeState::Disconnected,
        }
    }

    pub fn clients_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn local_clients_count(&self) -> usize {
        self.locals.iter().filter(|s| s.is_some()).count()
    }

    pub fn bridge_state(&self) -> BridgeState {
        self.bridge_state
    }

    // --- local clients ---

    /// Attach a new local client under `client_id`, returning a handle to
    /// it. Local clients own no transport: they are always "connected" and
    /// only ever receive a PUBLISH via the delivery callback the caller
    /// polls for through [`Broker::drain_local_deliveries`].
    pub fn attach_local(&mut self, client_id: impl Into<String>) -> LocalId {
        let entry = LocalEntry {
            session: ClientSession::local(client_id),
            deliveries: Vec::new(),
        };
        if let Some(slot) = self.locals.iter().position(Option::is_none) {
            self.locals[slot] = Some(entry);
            LocalId(slot)
        } else {
            self.locals.push(Some(entry));
            LocalId(self.locals.len() - 1)
        }
    }

    /// Detach a local client, releasing every topic it held a subscription
    /// reference on.
    pub fn detach_local(&mut self, id: LocalId) {
        let Some(slot) = self.locals.get_mut(id.0) else {
            return;
        };
        if let Some(entry) = slot.take() {
            for filter_id in entry.session.subscriptions() {
                self.interner.release(filter_id);
            }
        }
    }

    fn local_mut(&mut self, id: LocalId) -> Option<&mut ClientSession> {
        self.locals.get_mut(id.0)?.as_mut().map(|e| &mut e.session)
    }

    /// Subscribe a local client to `filter`. Per spec.md, this also
    /// forwards the subscription upstream via the bridge, if one is
    /// connected.
    ///
    /// An exhausted interner is a resource-exhaustion degradation, not user
    /// misuse: the call still returns `Ok(())`, the subscription just never
    /// matches anything, rather than aborting the caller's subscribe.
    pub fn subscribe_local(&mut self, id: LocalId, filter: &str, qos: Qos) -> Result<(), SubscribeError> {
        if self.local_mut(id).is_none() {
            return Err(SubscribeError::NowhereToSend);
        }
        let Ok(filter_id) = self.interner.intern(filter) else {
            warn!("interner full, subscription to {} will never match", filter);
            return Ok(());
        };
        self.local_mut(id)
            .expect("presence checked above")
            .insert_subscription(filter_id);

        if self.bridge_state == BridgeState::Connected {
            if let Some(bridge) = self.bridge.as_mut() {
                let _ = bridge.send_subscribe(&[(filter, qos)]);
            }
        }
        Ok(())
    }

    pub fn unsubscribe_local(&mut self, id: LocalId, filter: &str) -> Result<(), SubscribeError> {
        let Some(filter_id) = self.interner.find(filter) else {
            return Ok(());
        };
        let removed = match self.local_mut(id) {
            Some(session) if session.is_subscribed_to(filter_id) => {
                session.remove_subscription(filter_id);
                true
            }
            Some(_) => false,
            None => return Err(SubscribeError::NowhereToSend),
        };
        if removed {
            self.interner.release(filter_id);
        }
        Ok(())
    }

    pub fn is_local_subscribed_to(&self, id: LocalId, topic: &str) -> bool {
        let Some(Some(entry)) = self.locals.get(id.0) else {
            return false;
        };
        self.matches_any(&entry.session, topic)
    }

    /// Publish from a local client: fans out to every matching subscriber
    /// (local, accepted network clients, and the upstream bridge).
    pub fn publish_local(&mut self, id: LocalId, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if self.local_mut(id).is_none() {
            return Err(PublishError::NowhereToSend);
        }
        self.fan_out(Origin::Local, topic, payload);
        Ok(())
    }

    /// Pop every PUBLISH a local client has pending, in delivery order.
    pub fn drain_local_deliveries(&mut self, id: LocalId) -> Vec<(String, Vec<u8>)> {
        match self.locals.get_mut(id.0) {
            Some(Some(entry)) => core::mem::take(&mut entry.deliveries),
            _ => Vec::new(),
        }
    }

    // --- accept loop ---

    /// Advance the broker by one tick: accept at most one new connection,
    /// pump the bridge (if any), then pump every accepted session. Sessions
    /// that end up closed are dropped.
    pub fn tick(&mut self, now_ms: u64) {
        if let Some(transport) = self.listener.accept() {
            trace!("accepted new connection");
            self.accepted
                .push(ClientSession::accepted(transport, now_ms));
        }

        self.tick_bridge(now_ms);

        let mut i = 0;
        while i < self.accepted.len() {
            let events = {
                let session = &mut self.accepted[i];
                let mut events = session.pump(now_ms);
                if events.is_empty() {
                    let ev = session.check_keep_alive(now_ms);
                    if !matches!(ev, Event::None) {
                        events.push(ev);
                    }
                }
                events
            };

            let mut drop_session = false;
            for event in events {
                if matches!(event, Event::Closed(_)) {
                    drop_session = true;
                }
                self.handle_accepted_event(i, event, now_ms);
            }

            if drop_session || !self.accepted[i].connected() {
                self.accepted.remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn tick_bridge(&mut self, now_ms: u64) {
        let events = {
            let Some(bridge) = self.bridge.as_mut() else {
                return;
            };
            let mut events = bridge.pump(now_ms);
            if events.is_empty() {
                let ev = bridge.check_keep_alive(now_ms);
                if !matches!(ev, Event::None) {
                    events.push(ev);
                }
            }
            events
        };

        let mut closed = false;
        for event in events {
            match event {
                Event::BridgeConnected => {
                    self.bridge_state = BridgeState::Connected;
                    self.resubscribe_bridge();
                }
                Event::Publish { topic, payload } => {
                    self.fan_out(Origin::Bridge, &topic, &payload);
                }
                Event::Closed(reason) => {
                    warn!("bridge closed: {}", reason);
                    closed = true;
                }
                Event::None | Event::ConnectReceived { .. } | Event::Subscribed { .. } | Event::Unsubscribed { .. } => {}
            }
        }

        if closed || !self.bridge.as_ref().map(|b| b.connected()).unwrap_or(false) {
            self.bridge = None;
            self.bridge_state = BridgeState::Disconnected;
        }
    }

    /// Replay every currently-held subscription (across accepted, local,
    /// and re-derived from the interner) upstream after the bridge
    /// transitions to `Connected`.
    fn resubscribe_bridge(&mut self) {
        let mut filters = Vec::new();
        for session in self.accepted.iter() {
            for id in session.subscriptions() {
                if let Some(text) = self.interner.resolve(id) {
                    filters.push(String::from(text));
                }
            }
        }
        for entry in self.locals.iter().flatten() {
            for id in entry.session.subscriptions() {
                if let Some(text) = self.interner.resolve(id) {
                    filters.push(String::from(text));
                }
            }
        }
        filters.sort();
        filters.dedup();

        if let Some(bridge) = self.bridge.as_mut() {
            let refs: Vec<(&str, Qos)> = filters.iter().map(|f| (f.as_str(), Qos::AtMostOnce)).collect();
            let _ = bridge.send_subscribe(&refs);
        }
    }

    fn handle_accepted_event(&mut self, index: usize, event: Event, now_ms: u64) {
        match event {
            Event::None | Event::Closed(_) | Event::BridgeConnected => {}
            Event::ConnectReceived { username, password } => {
                if self.credentials_ok(username.as_deref(), password.as_deref()) {
                    if self.accepted[index].accept_connect(now_ms).is_err() {
                        self.accepted[index].close(false);
                    }
                } else {
                    self.accepted[index].reject_connect();
                    self.accepted[index].close(false);
                }
            }
            Event::Publish { topic, payload } => {
                self.fan_out(Origin::Accepted, &topic, &payload);
            }
            Event::Subscribed { filters } => {
                for (filter, _qos) in &filters {
                    if let Ok(filter_id) = self.interner.intern(filter) {
                        self.accepted[index].insert_subscription(filter_id);
                    }
                }
            }
            Event::Unsubscribed { filters } => {
                for filter in &filters {
                    if let Some(filter_id) = self.interner.find(filter) {
                        if self.accepted[index].is_subscribed_to(filter_id) {
                            self.accepted[index].remove_subscription(filter_id);
                            self.interner.release(filter_id);
                        }
                    }
                }
            }
        }
    }

    /// A CONNECT that omits a field entirely (no `FLAG_USERNAME`/
    /// `FLAG_PASSWORD`) is always accepted for that field, per spec.md's
    /// documented hole — only a field the client actually sent is checked
    /// against the configured value.
    fn credentials_ok(&self, username: Option<&[u8]>, password: Option<&[u8]>) -> bool {
        let user_ok = match (&self.config.username, username) {
            (Some(expected), Some(actual)) => actual == expected.as_bytes(),
            _ => true,
        };
        let pass_ok = match (&self.config.password, password) {
            (Some(expected), Some(actual)) => actual == expected.as_bytes(),
            _ => true,
        };
        user_ok && pass_ok
    }

    // --- bridge setup ---

    /// Begin connecting to an upstream broker at `host:port`. `L::Transport`
    /// is reused as the bridge's own transport type, so the caller supplies
    /// an already-opened transport (e.g. `TcpTransport::connect(...)`)
    /// rather than a host/port pair — the broker itself never resolves
    /// addresses.
    pub fn connect_bridge(
        &mut self,
        transport: Box<dyn Transport>,
        config: ClientConfig,
        now_ms: u64,
    ) -> Result<(), crate::mqtt::error::TransportError> {
        let session = ClientSession::connecting(transport, config, now_ms)?;
        self.bridge = Some(session);
        self.bridge_state = BridgeState::Connecting;
        Ok(())
    }

    // --- fan-out ---

    fn matches_any(&self, session: &ClientSession, topic_str: &str) -> bool {
        if let Some(topic_id) = self.interner.find(topic_str) {
            if session.is_subscribed_to(topic_id) {
                return true;
            }
        }
        session
            .subscriptions()
            .filter_map(|id| self.interner.resolve(id))
            .any(|filter| topic::matches(filter, topic_str))
    }

    /// Deliver `topic`/`payload` to every matching subscriber, applying the
    /// "no bridge echo, no bridge-to-bridge loop" policy from spec.md §4.4:
    /// an upstream-origin publish never goes back upstream, and (unless
    /// the source is the bridge) exactly one copy is forwarded upstream.
    fn fan_out(&mut self, origin: Origin, topic_str: &str, payload: &[u8]) {
        let bridge_live = self.bridge_state == BridgeState::Connected && self.bridge.is_some();
        let from_bridge = matches!(origin, Origin::Bridge);

        // The source itself stays in this loop: re-subscribing to one's own
        // topic is legal and the match decides, per spec.md (c).
        for i in 0..self.accepted.len() {
            if self.matches_any(&self.accepted[i], topic_str) {
                if self
                    .accepted[i]
                    .write_publish_if_subscribed(topic_str, payload)
                    .is_err()
                {
                    self.accepted[i].close(false);
                }
            }
        }

        self.deliver_locals(topic_str, payload);

        if bridge_live && !from_bridge {
            if let Some(bridge) = self.bridge.as_mut() {
                if bridge.publish_direct(topic_str, payload).is_err() {
                    self.bridge_state = BridgeState::Disconnected;
                }
            }
        }
    }

    fn deliver_locals(&mut self, topic_str: &str, payload: &[u8]) {
        for i in 0..self.locals.len() {
            let hit = match &self.locals[i] {
                Some(entry) => self.matches_any(&entry.session, topic_str),
                None => false,
            };
            if hit {
                if let Some(entry) = self.locals[i].as_mut() {
                    entry
                        .deliveries
                        .push((String::from(topic_str), payload.to_vec()));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Origin {
    Accepted,
    Local,
    Bridge,
}
