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

//! Static table of layer actions, addressed by [`LayerKey`].

use std::collections::BTreeMap;
use std::fmt;

use crate::action::LayerAction;
use crate::key::{Category, LayerKey};

/// Read-only lookup from key to action.
///
/// The sub-button index of an action is its position within its category,
/// so the table is stored as one ordered list per category.
pub struct ActionRegistry<L> {
    groups: BTreeMap<Category, Vec<LayerAction<L>>>,
}

impl<L> ActionRegistry<L> {
    #[must_use]
    pub fn builder() -> ActionRegistryBuilder<L> {
        ActionRegistryBuilder::new()
    }

    /// Look up the action for a key. `None` means nothing is registered there.
    #[must_use]
    pub fn get(&self, key: &LayerKey) -> Option<&LayerAction<L>> {
        self.groups.get(&key.category)?.get(key.index)
    }

    /// Ordered sub-buttons of one category (empty if none are registered).
    #[must_use]
    pub fn actions(&self, category: Category) -> &[LayerAction<L>] {
        self.groups.get(&category).map_or(&[], Vec::as_slice)
    }

    /// All registered keys, in category then index order.
    pub fn keys(&self) -> impl Iterator<Item = LayerKey> + '_ {
        self.groups.iter().flat_map(|(category, actions)| {
            (0..actions.len()).map(|index| LayerKey::new(*category, index))
        })
    }

    /// Iterate over every `(key, action)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (LayerKey, &LayerAction<L>)> + '_ {
        self.groups.iter().flat_map(|(category, actions)| {
            actions
                .iter()
                .enumerate()
                .map(|(index, action)| (LayerKey::new(*category, index), action))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L> fmt::Debug for ActionRegistry<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Builder for [`ActionRegistry`].
pub struct ActionRegistryBuilder<L> {
    groups: BTreeMap<Category, Vec<LayerAction<L>>>,
}

impl<L> ActionRegistryBuilder<L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }

    /// Append an action to a category; returns the key it was registered under.
    pub fn push(&mut self, category: Category, action: LayerAction<L>) -> LayerKey {
        let actions = self.groups.entry(category).or_default();
        actions.push(action);
        LayerKey::new(category, actions.len() - 1)
    }

    /// Chainable form of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, category: Category, action: LayerAction<L>) -> Self {
        self.push(category, action);
        self
    }

    #[must_use]
    pub fn build(self) -> ActionRegistry<L> {
        ActionRegistry {
            groups: self.groups,
        }
    }
}

impl<L> Default for ActionRegistryBuilder<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> fmt::Debug for ActionRegistryBuilder<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistryBuilder")
            .field("categories", &self.groups.len())
            .finish()
    }
}
