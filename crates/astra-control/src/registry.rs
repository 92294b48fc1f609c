// Copyright 2025 eraflo
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

//! Identity registry holding non-owning references to live assets.

use crate::error::BrokerError;
use astra_core::{Asset, AssetId};
use std::collections::HashMap;
use std::sync::Weak;

/// Entry in the asset registry: the display name and a weak back-reference.
struct AssetEntry {
    name: String,
    asset: Weak<dyn Asset>,
    order: u64,
}

impl AssetEntry {
    fn is_alive(&self) -> bool {
        self.asset.strong_count() > 0
    }
}

/// Maps identities to the assets registered under them.
///
/// The registry never owns an asset. Lookups hand out `Weak` references that
/// callers upgrade once the registry lock is released, so that dropping the
/// upgraded `Arc` can never re-enter the registry while it is locked.
#[derive(Default)]
pub struct AssetRegistry {
    entries: HashMap<AssetId, AssetEntry>,
    next_order: u64,
}

impl AssetRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `asset` under `id`.
    ///
    /// An entry whose asset is already gone is replaced. A live one is kept
    /// and the call fails with [`BrokerError::DuplicateIdentity`].
    pub fn insert(
        &mut self,
        id: AssetId,
        name: &str,
        asset: Weak<dyn Asset>,
    ) -> Result<(), BrokerError> {
        if let Some(existing) = self.entries.get(&id) {
            if existing.is_alive() {
                return Err(BrokerError::DuplicateIdentity {
                    id,
                    name: existing.name.clone(),
                });
            }
            log::debug!("AssetRegistry: Replacing dead entry for {id}");
        }

        let order = self.next_order;
        self.next_order += 1;
        self.entries.insert(
            id,
            AssetEntry {
                name: name.to_owned(),
                asset,
                order,
            },
        );
        Ok(())
    }

    /// Points an existing identity at another allocation.
    pub fn repoint(
        &mut self,
        id: AssetId,
        name: &str,
        asset: Weak<dyn Asset>,
    ) -> Result<(), BrokerError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(BrokerError::UnknownAsset(id))?;
        entry.name = name.to_owned();
        entry.asset = asset;
        Ok(())
    }

    /// Removes `id` unconditionally. Returns whether it was registered.
    pub fn remove(&mut self, id: AssetId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Removes `id` only if its asset no longer exists.
    ///
    /// Used when an asset is dropped: if the identity was re-pointed at a
    /// live replacement in the meantime, the entry stays.
    pub fn remove_if_dead(&mut self, id: AssetId) -> bool {
        match self.entries.get(&id) {
            Some(entry) if !entry.is_alive() => {
                self.entries.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Returns the back-reference registered under `id`.
    pub fn get(&self, id: AssetId) -> Option<Weak<dyn Asset>> {
        self.entries
            .get(&id)
            .filter(|entry| entry.is_alive())
            .map(|entry| entry.asset.clone())
    }

    /// Returns the identity of the earliest registered live asset named `name`.
    pub fn find_by_name(&self, name: &str) -> Option<AssetId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.name == name && entry.is_alive())
            .min_by_key(|(_, entry)| entry.order)
            .map(|(id, _)| *id)
    }

    /// Returns `true` if `id` is registered to a live asset.
    pub fn contains(&self, id: AssetId) -> bool {
        self.entries.get(&id).is_some_and(AssetEntry::is_alive)
    }

    /// Returns the number of live registered assets.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_alive()).count()
    }

    /// Returns true if no live assets are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
