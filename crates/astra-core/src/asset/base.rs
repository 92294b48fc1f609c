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

use super::AssetId;
use crate::alert::{AlertRecord, AlertState, Severity};
use crate::link::{BrokerLink, RequestSpec, Submission, Target};
use crate::resource::{ResourceHandle, ResourceId, ResourceType};
use std::any::Any;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

/// Identity, display name and alert state embedded in every asset.
///
/// The core keeps a weak link to the broker it was created for. It never keeps
/// the broker alive, and the broker never keeps the asset alive: dropping the
/// core unregisters its identity.
pub struct AssetCore {
    id: AssetId,
    name: String,
    alert: Mutex<AlertState>,
    link: Option<Weak<dyn BrokerLink>>,
}

impl AssetCore {
    /// Creates a core with a fresh identity, connected to `link`.
    pub fn new(name: impl Into<String>, link: Weak<dyn BrokerLink>) -> Self {
        Self::with_id(AssetId::generate(), name, link)
    }

    /// Creates a core that reuses an existing identity.
    ///
    /// Used to rebuild an asset in place (e.g. a hot reload) while keeping the
    /// identity other assets already address it by.
    pub fn with_id(id: AssetId, name: impl Into<String>, link: Weak<dyn BrokerLink>) -> Self {
        Self {
            id,
            name: name.into(),
            alert: Mutex::new(AlertState::default()),
            link: Some(link),
        }
    }

    /// Creates a core that is not connected to any broker.
    ///
    /// Alerts go straight to the `log` facade and every request is dead on
    /// arrival.
    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            id: AssetId::generate(),
            name: name.into(),
            alert: Mutex::new(AlertState::default()),
            link: None,
        }
    }

    /// Returns the identity of the owning asset.
    pub fn id(&self) -> AssetId {
        self.id
    }

    /// Returns the display name of the owning asset.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a snapshot of the current alert state.
    pub fn alert_state(&self) -> AlertState {
        self.lock_alert().clone()
    }

    /// Raises an alert.
    ///
    /// The local state is updated first, then a record is forwarded to the
    /// broker for escalation. A FATAL local state is never overwritten.
    pub fn alert(&self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        {
            let mut state = self.lock_alert();
            if !state.is_fatal() {
                *state = AlertState::raised(severity, message.clone());
            }
        }

        let record = AlertRecord::new(self.id, self.name.clone(), message, severity);
        match self.link() {
            Some(link) => link.escalate(record),
            None => record.emit_direct(),
        }
    }

    /// Clears the local alert state.
    ///
    /// Returns `false` and leaves the state untouched if the current alert is
    /// FATAL.
    pub fn reset_alert(&self) -> bool {
        let mut state = self.lock_alert();
        if state.is_fatal() {
            return false;
        }
        *state = AlertState::default();
        true
    }

    /// Returns `true` once the broker has entered its fatal state.
    ///
    /// Long-running loops hosted by an asset should check this and wind down.
    pub fn is_fatal(&self) -> bool {
        match self.link() {
            Some(link) => link.is_fatal(),
            None => self.lock_alert().is_fatal(),
        }
    }

    /// Requests a resource of type `T` from another asset.
    ///
    /// The returned handle is PENDING until the resolver worker answers it.
    /// When `target` is a name that matches no registered asset, a WARNING
    /// alert is raised on this asset and the handle goes DEAD after the next
    /// resolver pass.
    pub fn request<T: Any + Send + Sync>(
        &self,
        target: impl Into<Target>,
        resource: impl Into<ResourceId>,
        args: &[i64],
    ) -> ResourceHandle<T> {
        let target = target.into();
        let resource = resource.into();

        let Some(link) = self.link() else {
            log::warn!(
                "{} requested '{}' from {} without a broker",
                self.name,
                resource,
                target
            );
            return ResourceHandle::dead(self.id, resource, args.to_vec());
        };

        let spec = RequestSpec {
            caller: self.id,
            target,
            resource: resource.clone(),
            args: args.to_vec(),
            resource_type: ResourceType::of::<T>(),
        };

        match link.submit(spec) {
            Submission::Accepted(request) => ResourceHandle::new(request),
            Submission::UnknownTarget { name, request } => {
                self.alert(
                    format!("no asset named '{name}' to request '{resource}' from"),
                    Severity::Warning,
                );
                ResourceHandle::new(request)
            }
        }
    }

    fn link(&self) -> Option<std::sync::Arc<dyn BrokerLink>> {
        self.link.as_ref().and_then(Weak::upgrade)
    }

    fn lock_alert(&self) -> MutexGuard<'_, AlertState> {
        self.alert.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for AssetCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("alert", &*self.lock_alert())
            .finish()
    }
}

impl Drop for AssetCore {
    fn drop(&mut self) {
        if let Some(link) = self.link() {
            link.release(self.id);
        }
    }
}
