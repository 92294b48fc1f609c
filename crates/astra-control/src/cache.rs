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

//! Cache of resolved and in-flight requests, used to deduplicate asks.

use astra_core::{AssetId, RequestState, ResourceKey, ResourceRequest};
use std::collections::HashMap;
use std::sync::Arc;

/// Requests that are READY or still waiting on their sender, keyed by
/// [`ResourceKey`].
///
/// A later request for the same key is served from the cached entry instead
/// of consulting the sender again.
#[derive(Default)]
pub struct ResolvedCache {
    entries: HashMap<ResourceKey, Arc<ResourceRequest>>,
}

impl ResolvedCache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry that can no longer serve anyone: DEAD or STALE
    /// requests, and READY requests whose resource is gone.
    pub fn purge(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, request| match request.state() {
            RequestState::Pending => true,
            RequestState::Ready => request.is_live(),
            RequestState::Dead | RequestState::Stale => false,
        });
        before - self.entries.len()
    }

    /// Returns the cached request for `key`.
    pub fn get(&self, key: &ResourceKey) -> Option<Arc<ResourceRequest>> {
        self.entries.get(key).cloned()
    }

    /// Caches `request` under its own key, replacing any previous entry.
    pub fn insert(&mut self, request: Arc<ResourceRequest>) {
        self.entries.insert(request.key().clone(), request);
    }

    /// Removes the entry for `key` if it is exactly `request`.
    pub fn evict(&mut self, request: &Arc<ResourceRequest>) -> bool {
        match self.entries.get(request.key()) {
            Some(cached) if Arc::ptr_eq(cached, request) => {
                self.entries.remove(request.key());
                true
            }
            _ => false,
        }
    }

    /// Invalidates everything served by `sender`.
    ///
    /// PENDING entries become DEAD, READY ones become STALE, and all of them
    /// leave the cache. Returns how many entries were dropped.
    pub fn invalidate_sender(&mut self, sender: AssetId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, request| {
            if key.sender != sender {
                return true;
            }
            if !request.mark_dead() {
                request.mark_stale();
            }
            false
        });
        self.purge();
        before - self.entries.len()
    }

    /// Marks every PENDING entry DEAD and empties the cache.
    pub fn abandon(&mut self) {
        for (_, request) in self.entries.drain() {
            request.mark_dead();
        }
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astra_core::{ResourceId, ResourceType};

    fn request(sender: u64, name: &str) -> Arc<ResourceRequest> {
        ResourceRequest::new(
            AssetId::from_raw(1),
            ResourceKey::new(AssetId::from_raw(sender), ResourceId::from(name), vec![]),
            ResourceType::of::<String>(),
        )
    }

    #[test]
    fn purge_keeps_pending_and_live_entries() {
        let mut cache = ResolvedCache::new();
        let pending = request(2, "pending");
        let live = request(2, "live");
        let vanished = request(2, "vanished");
        let dead = request(2, "dead");

        let value: Arc<dyn std::any::Any + Send + Sync> = Arc::new(String::from("ok"));
        live.fulfill(&value, "String").unwrap();
        {
            let short_lived: Arc<dyn std::any::Any + Send + Sync> = Arc::new(String::new());
            vanished.fulfill(&short_lived, "String").unwrap();
        }
        dead.mark_dead();

        for r in [&pending, &live, &vanished, &dead] {
            cache.insert(Arc::clone(r));
        }

        assert_eq!(cache.purge(), 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(pending.key()).is_some());
        assert!(cache.get(live.key()).is_some());
    }

    #[test]
    fn invalidate_sender_settles_and_evicts() {
        let mut cache = ResolvedCache::new();
        let pending = request(2, "pending");
        let ready = request(2, "ready");
        let other = request(3, "other");

        let value: Arc<dyn std::any::Any + Send + Sync> = Arc::new(String::from("ok"));
        ready.fulfill(&value, "String").unwrap();

        for r in [&pending, &ready, &other] {
            cache.insert(Arc::clone(r));
        }

        assert_eq!(cache.invalidate_sender(AssetId::from_raw(2)), 2);
        assert_eq!(pending.state(), RequestState::Dead);
        assert_eq!(ready.state(), RequestState::Stale);
        assert_eq!(other.state(), RequestState::Pending);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evict_only_removes_the_same_request() {
        let mut cache = ResolvedCache::new();
        let first = request(2, "mesh");
        let second = request(2, "mesh");
        cache.insert(Arc::clone(&first));

        assert!(!cache.evict(&second));
        assert!(cache.evict(&first));
        assert!(cache.is_empty());
    }
}
