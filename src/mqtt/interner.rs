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

//! Topic string interning.
//!
//! Every subscription and every PUBLISH topic is reduced to a small
//! `u8` index so that matching two topics against each other is an
//! integer comparison rather than a string compare. Index `0` is
//! reserved and never handed out, so `Option<TopicId>` niches to a
//! single byte.
//!
//! Unlike the global singleton table in the source this was ported
//! from, the table here lives on [`crate::mqtt::Broker`] and is threaded
//! through explicitly; nothing in this crate reaches for global state.

use crate::mqtt::common::HashMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Interned topic handle. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicId(core::num::NonZeroU8);

impl TopicId {
    pub fn get(self) -> u8 {
        self.0.get()
    }
}

struct Slot {
    text: String,
    refs: u32,
}

/// Reference-counted topic string table, capacity 255 (index 0 reserved).
///
/// Entries are released back to the free list as soon as their
/// refcount drops to zero, and the smallest free index is reused on
/// the next [`intern`](StringInterner::intern) — this mirrors the
/// linear-scan allocation strategy of the table it was grounded on
/// rather than porting its interval-tree free list, since 255 entries
/// makes the scan cost irrelevant.
#[derive(Default)]
pub struct StringInterner {
    slots: Vec<Option<Slot>>,
    by_text: HashMap<String, TopicId>,
}

/// Interning failed because all 255 indices are in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternerFull;

impl StringInterner {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            by_text: HashMap::new(),
        }
    }

    /// Look up an existing id for `topic` without creating one.
    pub fn find(&self, topic: &str) -> Option<TopicId> {
        self.by_text.get(topic).copied()
    }

    /// Intern `topic`, bumping its refcount if it already exists.
    pub fn intern(&mut self, topic: &str) -> Result<TopicId, InternerFull> {
        if let Some(&id) = self.by_text.get(topic) {
            self.slots[(id.get() - 1) as usize]
                .as_mut()
                .expect("interned id always has a live slot")
                .refs += 1;
            return Ok(id);
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len());
        if index >= 255 {
            return Err(InternerFull);
        }

        let id = TopicId(core::num::NonZeroU8::new((index + 1) as u8).unwrap());
        let slot = Slot {
            text: topic.into(),
            refs: 1,
        };
        if index == self.slots.len() {
            self.slots.push(Some(slot));
        } else {
            self.slots[index] = Some(slot);
        }
        self.by_text.insert(topic.into(), id);
        Ok(id)
    }

    /// Resolve an id back to its string.
    pub fn resolve(&self, id: TopicId) -> Option<&str> {
        self.slots
            .get((id.get() - 1) as usize)?
            .as_ref()
            .map(|slot| slot.text.as_str())
    }

    /// Drop one reference to `id`, freeing the slot once it reaches zero.
    pub fn release(&mut self, id: TopicId) {
        let index = (id.get() - 1) as usize;
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        let Some(s) = slot else { return };
        s.refs -= 1;
        if s.refs == 0 {
            let text = s.text.clone();
            self.by_text.remove(&text);
            *slot = None;
        }
    }

    pub fn is_used(&self, id: TopicId) -> bool {
        matches!(self.slots.get((id.get() - 1) as usize), Some(Some(_)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
