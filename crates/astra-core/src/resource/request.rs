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

use super::{CancelToken, RequestState, ResourceError, ResourceKey, ResourceType};
use crate::asset::AssetId;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

/// A resource as seen by a request: borrowed, never owned.
pub(crate) type ErasedResource = Weak<dyn Any + Send + Sync>;

#[derive(Clone)]
enum Outcome {
    Ready {
        resource: ErasedResource,
        resource_type: ResourceType,
    },
    Dead,
}

struct RequestInner {
    state: RequestState,
    resource: Option<ErasedResource>,
    /// Requests deduplicated against this one while it was still pending.
    followers: Vec<Arc<ResourceRequest>>,
}

/// The shared state of one outstanding resource ask.
///
/// Shared by the broker's queue and cache, every [`ResourceHandle`] of the
/// caller and the [`ResourceAsk`] of the sender. Each request carries its own
/// lock and condition variable; every state transition wakes the waiters.
///
/// [`ResourceHandle`]: super::ResourceHandle
/// [`ResourceAsk`]: super::ResourceAsk
pub struct ResourceRequest {
    caller: AssetId,
    key: ResourceKey,
    resource_type: ResourceType,
    handles: AtomicUsize,
    inner: Mutex<RequestInner>,
    changed: Condvar,
}

impl ResourceRequest {
    /// Creates a PENDING request.
    pub fn new(caller: AssetId, key: ResourceKey, resource_type: ResourceType) -> Arc<Self> {
        Arc::new(Self {
            caller,
            key,
            resource_type,
            handles: AtomicUsize::new(0),
            inner: Mutex::new(RequestInner {
                state: RequestState::Pending,
                resource: None,
                followers: Vec::new(),
            }),
            changed: Condvar::new(),
        })
    }

    /// The asset that asked.
    pub fn caller(&self) -> AssetId {
        self.caller
    }

    /// The asset expected to answer.
    pub fn sender(&self) -> AssetId {
        self.key.sender
    }

    /// The deduplication key.
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// The type the caller reads the resource as.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// The current state.
    pub fn state(&self) -> RequestState {
        self.lock().state
    }

    /// The number of live handles on this request.
    pub fn handle_count(&self) -> usize {
        self.handles.load(Ordering::Acquire)
    }

    /// The number of requests waiting on this one to settle.
    pub fn follower_count(&self) -> usize {
        self.lock().followers.len()
    }

    /// Returns `true` if the request is READY and its resource still exists.
    pub fn is_live(&self) -> bool {
        let inner = self.lock();
        inner.state == RequestState::Ready
            && inner
                .resource
                .as_ref()
                .is_some_and(|resource| resource.strong_count() > 0)
    }

    /// Attaches a resource and moves the request to READY.
    ///
    /// The request only keeps a weak pointer: the sender must keep `resource`
    /// alive for as long as it wants the caller to see it. A value the caller
    /// cannot read as its requested type marks the request DEAD.
    pub fn fulfill(
        &self,
        resource: &Arc<dyn Any + Send + Sync>,
        found: &'static str,
    ) -> Result<(), ResourceError> {
        if !self.resource_type.accepts(&**resource) {
            self.mark_dead();
            return Err(ResourceError::TypeMismatch {
                key: self.key.clone(),
                expected: self.resource_type.name(),
                found,
            });
        }

        let outcome = Outcome::Ready {
            resource: Arc::downgrade(resource),
            resource_type: self.resource_type,
        };
        if self.settle(outcome) {
            Ok(())
        } else {
            Err(ResourceError::NotPending {
                key: self.key.clone(),
                state: self.state(),
            })
        }
    }

    /// Lets `follower` share the answer of `leader`.
    ///
    /// A READY leader with a live resource settles the follower at once; a
    /// PENDING leader settles it together with itself. Returns `false` if the
    /// leader can no longer serve anyone (DEAD, STALE, or its resource is
    /// gone), in which case the follower is left untouched.
    pub fn follow(leader: &Arc<ResourceRequest>, follower: &Arc<ResourceRequest>) -> bool {
        let outcome = {
            let mut inner = leader.lock();
            match inner.state {
                RequestState::Pending => {
                    inner.followers.push(Arc::clone(follower));
                    return true;
                }
                RequestState::Ready => {}
                RequestState::Dead | RequestState::Stale => return false,
            }
            match &inner.resource {
                Some(resource) if resource.strong_count() > 0 => Outcome::Ready {
                    resource: resource.clone(),
                    resource_type: leader.resource_type,
                },
                _ => return false,
            }
        };
        follower.settle(outcome);
        true
    }

    /// Moves a PENDING request to DEAD. Returns whether the state changed.
    pub fn mark_dead(&self) -> bool {
        self.settle(Outcome::Dead)
    }

    /// Moves the request to STALE and drops its resource pointer.
    ///
    /// Followers are left attached: the sender may still answer them.
    pub fn mark_stale(&self) -> bool {
        let changed = {
            let mut inner = self.lock();
            if inner.state.can_transition_to(RequestState::Stale) {
                inner.state = RequestState::Stale;
                inner.resource = None;
                true
            } else {
                false
            }
        };
        if changed {
            self.changed.notify_all();
        }
        changed
    }

    /// Blocks until the request leaves PENDING, the deadline passes, or the
    /// token is cancelled. Returns the state observed last.
    pub fn wait(&self, deadline: Option<Instant>, cancel: Option<&CancelToken>) -> RequestState {
        let mut inner = self.lock();
        loop {
            if inner.state.is_settled() || cancel.is_some_and(CancelToken::is_cancelled) {
                return inner.state;
            }
            inner = match deadline {
                None => self
                    .changed
                    .wait(inner)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return inner.state;
                    }
                    self.changed
                        .wait_timeout(inner, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    pub(crate) fn resource(&self) -> Option<ErasedResource> {
        let inner = self.lock();
        match inner.state {
            RequestState::Ready => inner.resource.clone(),
            _ => None,
        }
    }

    pub(crate) fn retain_handle(&self) {
        self.handles.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns `true` when the last handle was released.
    pub(crate) fn release_handle(&self) -> bool {
        self.handles.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Wakes waiters without changing state, so they re-check their exit
    /// conditions.
    pub(crate) fn wake(&self) {
        let _inner = self.lock();
        self.changed.notify_all();
    }

    fn settle(&self, outcome: Outcome) -> bool {
        let (changed, followers) = {
            let mut inner = self.lock();
            let next = match &outcome {
                Outcome::Ready { resource_type, .. } if *resource_type == self.resource_type => {
                    RequestState::Ready
                }
                Outcome::Ready { resource_type, .. } => {
                    log::debug!(
                        "Request {} wants `{}` but the shared answer is `{}`",
                        self.key,
                        self.resource_type.name(),
                        resource_type.name()
                    );
                    RequestState::Dead
                }
                Outcome::Dead => RequestState::Dead,
            };

            let changed = inner.state.can_transition_to(next);
            if changed {
                inner.state = next;
                if let (RequestState::Ready, Outcome::Ready { resource, .. }) = (next, &outcome) {
                    inner.resource = Some(resource.clone());
                }
            }
            (changed, std::mem::take(&mut inner.followers))
        };

        if changed {
            self.changed.notify_all();
        }
        for follower in followers {
            follower.settle(outcome.clone());
        }
        changed
    }

    fn lock(&self) -> MutexGuard<'_, RequestInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRequest")
            .field("caller", &self.caller)
            .field("key", &self.key)
            .field("type", &self.resource_type)
            .field("state", &self.state())
            .field("handles", &self.handle_count())
            .finish()
    }
}
