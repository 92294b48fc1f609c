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

use super::{CancelToken, RequestState, ResourceId, ResourceKey, ResourceRequest, ResourceType};
use crate::asset::AssetId;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// The caller-side, typed view of a [`ResourceRequest`].
///
/// Cloning a handle is cheap: every clone points at the same request and
/// counts as one more interested caller. When the last handle is dropped the
/// request turns STALE and the broker stops caring about it.
///
/// A handle never hands out a value before its request is READY, and never
/// keeps the resource alive: [`get`](Self::get) returns `None` once the owner
/// dropped it.
pub struct ResourceHandle<T: Any + Send + Sync> {
    request: Arc<ResourceRequest>,
    bound: Option<Weak<T>>,
}

impl<T: Any + Send + Sync> ResourceHandle<T> {
    /// Wraps a request, registering one more handle on it.
    pub fn new(request: Arc<ResourceRequest>) -> Self {
        request.retain_handle();
        Self {
            request,
            bound: None,
        }
    }

    /// Creates a handle on a request that is DEAD from the start.
    ///
    /// Returned when there is nobody to send the request to.
    pub fn dead(caller: AssetId, resource: ResourceId, args: Vec<i64>) -> Self {
        let request = ResourceRequest::new(
            caller,
            ResourceKey::new(AssetId::NONE, resource, args),
            ResourceType::of::<T>(),
        );
        request.mark_dead();
        Self::new(request)
    }

    /// The current state, without binding anything.
    pub fn state(&self) -> RequestState {
        self.request.state()
    }

    /// The deduplication key of the underlying request.
    pub fn key(&self) -> &ResourceKey {
        self.request.key()
    }

    /// The shared request behind this handle.
    pub fn request(&self) -> &Arc<ResourceRequest> {
        &self.request
    }

    /// Checks the request without blocking.
    ///
    /// The first time READY is observed the typed pointer is bound. If the
    /// resource no longer exists, or is not a `T`, the request is forced
    /// STALE and STALE is returned.
    pub fn poll(&mut self) -> RequestState {
        let state = self.request.state();
        if state != RequestState::Ready {
            return state;
        }

        let alive = match &self.bound {
            Some(bound) => bound.strong_count() > 0,
            None => match self.bind() {
                Some(typed) => {
                    self.bound = Some(Arc::downgrade(&typed));
                    true
                }
                None => false,
            },
        };

        if alive {
            RequestState::Ready
        } else {
            log::debug!("Resource {} vanished before it was read", self.request.key());
            self.request.mark_stale();
            self.request.state()
        }
    }

    /// Blocks until the request leaves PENDING, then polls it.
    pub fn wait(&mut self) -> RequestState {
        self.request.wait(None, None);
        self.poll()
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    ///
    /// Returns PENDING if the request is still unanswered.
    pub fn wait_timeout(&mut self, timeout: Duration) -> RequestState {
        self.request.wait(Some(Instant::now() + timeout), None);
        self.poll()
    }

    /// Like [`wait`](Self::wait), giving up when `token` is cancelled or the
    /// optional `timeout` elapses.
    pub fn wait_cancellable(
        &mut self,
        token: &CancelToken,
        timeout: Option<Duration>,
    ) -> RequestState {
        token.register(&self.request);
        self.request
            .wait(timeout.map(|t| Instant::now() + t), Some(token));
        self.poll()
    }

    /// Returns the resource if the request is READY and the resource exists.
    pub fn get(&self) -> Option<Arc<T>> {
        if self.request.state() != RequestState::Ready {
            return None;
        }
        match &self.bound {
            Some(bound) => bound.upgrade(),
            None => self.bind(),
        }
    }

    /// Returns `true` if [`get`](Self::get) would currently succeed.
    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }

    fn bind(&self) -> Option<Arc<T>> {
        self.request
            .resource()
            .and_then(|resource| resource.upgrade())
            .and_then(|resource| resource.downcast::<T>().ok())
    }
}

impl<T: Any + Send + Sync> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        self.request.retain_handle();
        Self {
            request: Arc::clone(&self.request),
            bound: self.bound.clone(),
        }
    }
}

impl<T: Any + Send + Sync> Drop for ResourceHandle<T> {
    fn drop(&mut self) {
        if self.request.release_handle() && self.request.mark_stale() {
            log::trace!("Request {} abandoned by its caller", self.request.key());
        }
    }
}

impl<T: Any + Send + Sync> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("type", &std::any::type_name::<T>())
            .field("request", &self.request)
            .finish()
    }
}
