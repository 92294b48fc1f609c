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

use super::{RequestState, ResourceError, ResourceId, ResourceKey, ResourceRequest};
use crate::asset::AssetId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The sender-side view of a [`ResourceRequest`].
///
/// An asset receives one ask per request addressed to it, through
/// [`Asset::resolve`](crate::Asset::resolve). It may answer immediately or
/// keep the ask and answer from another thread later. An ask dropped without
/// an answer kills its request, so callers never wait on a forgotten ask.
pub struct ResourceAsk {
    request: Arc<ResourceRequest>,
}

impl ResourceAsk {
    /// Wraps a request for its sender.
    pub fn new(request: Arc<ResourceRequest>) -> Self {
        Self { request }
    }

    /// The asset asking for the resource.
    pub fn caller(&self) -> AssetId {
        self.request.caller()
    }

    /// The full deduplication key.
    pub fn key(&self) -> &ResourceKey {
        self.request.key()
    }

    /// The requested resource.
    pub fn resource(&self) -> &ResourceId {
        &self.request.key().resource
    }

    /// The numeric arguments of the request.
    pub fn args(&self) -> &[i64] {
        &self.request.key().args
    }

    /// The name of the type the caller reads the resource as.
    pub fn expected_type(&self) -> &'static str {
        self.request.resource_type().name()
    }

    /// The current state of the request.
    pub fn state(&self) -> RequestState {
        self.request.state()
    }

    /// Answers the request with `resource` and moves it to READY.
    ///
    /// Only a weak pointer is kept: the caller sees the resource for as long
    /// as the sender keeps `resource` alive. A resource of the wrong type marks
    /// the request DEAD.
    pub fn set_resource<R: Any + Send + Sync>(
        &self,
        resource: &Arc<R>,
    ) -> Result<(), ResourceError> {
        let erased: Arc<dyn Any + Send + Sync> = resource.clone();
        self.request.fulfill(&erased, std::any::type_name::<R>())
    }

    /// Refuses the request.
    ///
    /// A PENDING request goes DEAD. An already READY request can only become
    /// STALE, which drops its resource pointer.
    pub fn invalidate(&self) {
        if !self.request.mark_dead() {
            self.request.mark_stale();
        }
    }
}

impl Drop for ResourceAsk {
    fn drop(&mut self) {
        if self.request.state() == RequestState::Pending && self.request.mark_dead() {
            log::debug!(
                "Request {} dropped by its sender without an answer",
                self.request.key()
            );
        }
    }
}

impl fmt::Debug for ResourceAsk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceAsk")
            .field("request", &self.request)
            .finish()
    }
}
