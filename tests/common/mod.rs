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

//! In-memory `Transport`/`Listener` test doubles: no sockets, so the whole
//! suite runs deterministically and fast, driving [`tinymqtt::mqtt::Broker`]
//! and [`tinymqtt::mqtt::ClientSession`] exactly as a real TCP transport
//! would.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tinymqtt::mqtt::error::TransportError;
use tinymqtt::mqtt::transport::{Listener, Transport};

struct Pipe {
    bytes: VecDeque<u8>,
    open: bool,
}

/// One end of an in-memory duplex byte pipe.
pub struct MemoryTransport {
    // Bytes this end has written, read by the peer.
    outbox: Rc<RefCell<Pipe>>,
    // Bytes the peer has written, read by this end.
    inbox: Rc<RefCell<Pipe>>,
}

/// Build a connected pair: writes on one side show up as reads on the
/// other, just like a socketpair.
pub fn memory_pair() -> (MemoryTransport, MemoryTransport) {
    let a_to_b = Rc::new(RefCell::new(Pipe {
        bytes: VecDeque::new(),
        open: true,
    }));
    let b_to_a = Rc::new(RefCell::new(Pipe {
        bytes: VecDeque::new(),
        open: true,
    }));
    let a = MemoryTransport {
        outbox: a_to_b.clone(),
        inbox: b_to_a.clone(),
    };
    let b = MemoryTransport {
        outbox: b_to_a,
        inbox: a_to_b,
    };
    (a, b)
}

impl Transport for MemoryTransport {
    fn available(&mut self) -> usize {
        self.inbox.borrow().bytes.len()
    }

    fn read_byte(&mut self) -> u8 {
        self.inbox.borrow_mut().bytes.pop_front().unwrap_or(0)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut outbox = self.outbox.borrow_mut();
        if !outbox.open {
            return Err(TransportError);
        }
        outbox.bytes.extend(bytes.iter().copied());
        Ok(())
    }

    fn connected(&self) -> bool {
        self.outbox.borrow().open && self.inbox.borrow().open
    }

    fn stop(&mut self) {
        self.outbox.borrow_mut().open = false;
        self.inbox.borrow_mut().open = false;
    }
}

/// A [`Listener`] that hands out a fixed queue of pre-built transports, one
/// per `accept()` call, then returns `None` forever after.
#[derive(Default)]
pub struct QueueListener {
    pending: VecDeque<MemoryTransport>,
}

impl QueueListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transport: MemoryTransport) {
        self.pending.push_back(transport);
    }
}

impl Listener for QueueListener {
    type Transport = MemoryTransport;

    fn accept(&mut self) -> Option<MemoryTransport> {
        self.pending.pop_front()
    }
}
