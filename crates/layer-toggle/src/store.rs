// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Active layer store.
//!
//! Authoritative record of which keys have a layer in flight or attached to
//! the canvas. It mirrors canvas attachment 1:1 and is only mutated by the
//! toggle controller.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::key::LayerKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("layer '{0}' already has an entry")]
    DuplicateKey(LayerKey),
}

/// Coarse status of a store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Action invoked, result not yet applied.
    Pending,
    /// Layer attached to the canvas.
    Active,
}

/// Identifies one toggle-on attempt.
///
/// A resolution is applied only if the pending entry still carries the
/// ticket it was issued with; anything else is a stale result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Debug)]
pub enum EntryState<L> {
    Pending { ticket: Ticket, since: Instant },
    Active(L),
}

/// One store entry.
#[derive(Debug)]
pub struct Entry<L> {
    pub key: LayerKey,
    pub state: EntryState<L>,
}

impl<L> Entry<L> {
    #[must_use]
    pub fn status(&self) -> Status {
        match self.state {
            EntryState::Pending { .. } => Status::Pending,
            EntryState::Active(_) => Status::Active,
        }
    }

    /// The attached layer, if the entry is active.
    #[must_use]
    pub fn layer(&self) -> Option<&L> {
        match &self.state {
            EntryState::Active(layer) => Some(layer),
            EntryState::Pending { .. } => None,
        }
    }

    /// Consume the entry, returning its layer if it was active.
    #[must_use]
    pub fn into_layer(self) -> Option<L> {
        match self.state {
            EntryState::Active(layer) => Some(layer),
            EntryState::Pending { .. } => None,
        }
    }

    /// How long the entry has been waiting on its action.
    #[must_use]
    pub fn pending_for(&self) -> Option<Duration> {
        match self.state {
            EntryState::Pending { since, .. } => Some(since.elapsed()),
            EntryState::Active(_) => None,
        }
    }

    fn ticket(&self) -> Option<Ticket> {
        match self.state {
            EntryState::Pending { ticket, .. } => Some(ticket),
            EntryState::Active(_) => None,
        }
    }
}

/// Map from key to its single entry.
#[derive(Debug)]
pub struct ActiveLayerStore<L> {
    entries: HashMap<LayerKey, Entry<L>>,
    next_ticket: u64,
}

impl<L> ActiveLayerStore<L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_ticket: 0,
        }
    }

    #[must_use]
    pub fn has(&self, key: &LayerKey) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &LayerKey) -> Option<&Entry<L>> {
        self.entries.get(key)
    }

    /// Insert an entry. Fails if the key already has one.
    pub fn put(&mut self, key: LayerKey, state: EntryState<L>) -> Result<(), StoreError> {
        if self.entries.contains_key(&key) {
            return Err(StoreError::DuplicateKey(key));
        }
        self.entries.insert(key, Entry { key, state });
        Ok(())
    }

    pub fn remove(&mut self, key: &LayerKey) -> Option<Entry<L>> {
        self.entries.remove(key)
    }

    /// Record a new pending entry and return its ticket.
    pub fn begin_pending(&mut self, key: LayerKey) -> Result<Ticket, StoreError> {
        let ticket = Ticket(self.next_ticket);
        self.put(
            key,
            EntryState::Pending {
                ticket,
                since: Instant::now(),
            },
        )?;
        self.next_ticket += 1;
        Ok(ticket)
    }

    /// Whether `key` is pending under exactly this ticket.
    #[must_use]
    pub fn is_pending_with(&self, key: &LayerKey, ticket: Ticket) -> bool {
        self.entries
            .get(key)
            .and_then(Entry::ticket)
            .is_some_and(|t| t == ticket)
    }

    /// Promote a pending entry to active.
    ///
    /// Hands the layer back if the entry is gone or belongs to another
    /// toggle-on attempt.
    pub fn activate(&mut self, key: &LayerKey, ticket: Ticket, layer: L) -> Result<(), L> {
        match self.entries.get_mut(key) {
            Some(entry) if entry.ticket() == Some(ticket) => {
                entry.state = EntryState::Active(layer);
                Ok(())
            }
            _ => Err(layer),
        }
    }

    /// Drop a pending entry whose action produced nothing.
    /// Returns `false` if the ticket is stale.
    pub fn discard_pending(&mut self, key: &LayerKey, ticket: Ticket) -> bool {
        if self.is_pending_with(key, ticket) {
            self.entries.remove(key);
            true
        } else {
            false
        }
    }

    /// Keys currently in the given status, sorted.
    #[must_use]
    pub fn keys_with_status(&self, status: Status) -> Vec<LayerKey> {
        let mut keys: Vec<_> = self
            .entries
            .values()
            .filter(|e| e.status() == status)
            .map(|e| e.key)
            .collect();
        keys.sort();
        keys
    }

    /// Remove every entry.
    pub fn drain(&mut self) -> Vec<Entry<L>> {
        self.entries.drain().map(|(_, entry)| entry).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L> Default for ActiveLayerStore<L> {
    fn default() -> Self {
        Self::new()
    }
}
