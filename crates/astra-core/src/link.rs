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

//! The contract between assets and the broker that serves them.
//!
//! `astra-core` only knows the shape of the broker. The concrete broker lives
//! in `astra-control` and is reached through a `Weak<dyn BrokerLink>` held by
//! every [`AssetCore`](crate::AssetCore).

use crate::alert::AlertRecord;
use crate::asset::AssetId;
use crate::resource::{ResourceId, ResourceRequest, ResourceType};
use std::fmt;
use std::sync::Arc;

/// How a request addresses the asset that owns the resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Address the sender by identity.
    Id(AssetId),
    /// Address the sender by display name.
    Name(String),
}

impl From<AssetId> for Target {
    fn from(id: AssetId) -> Self {
        Target::Id(id)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Name(name.to_owned())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::Name(name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Id(id) => write!(f, "asset {id}"),
            Target::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// Everything the broker needs to open a request.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// The asset asking for the resource.
    pub caller: AssetId,
    /// The asset expected to own the resource.
    pub target: Target,
    /// Which resource is wanted.
    pub resource: ResourceId,
    /// Ordered numeric arguments, part of the cache key.
    pub args: Vec<i64>,
    /// The type the caller will read the resource as.
    pub resource_type: ResourceType,
}

/// The broker's answer to [`BrokerLink::submit`].
#[derive(Debug)]
pub enum Submission {
    /// The request was queued, or resolved on the spot.
    Accepted(Arc<ResourceRequest>),
    /// The target name matched no registered asset. The request is addressed
    /// to [`AssetId::NONE`] and will go DEAD on the next resolver pass.
    UnknownTarget {
        /// The name that failed to match.
        name: String,
        /// The unaddressable request.
        request: Arc<ResourceRequest>,
    },
}

/// The broker operations an asset depends on.
pub trait BrokerLink: Send + Sync {
    /// Routes an alert record towards the logger, raising the fatal gate on
    /// FATAL records.
    fn escalate(&self, record: AlertRecord);

    /// Opens a resource request. Never blocks on resolution.
    fn submit(&self, spec: RequestSpec) -> Submission;

    /// Forgets an identity whose asset is being dropped.
    fn release(&self, id: AssetId);

    /// Returns `true` once a FATAL alert has been escalated.
    fn is_fatal(&self) -> bool;
}
