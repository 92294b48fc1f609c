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

//! # Astra Core
//!
//! Foundational crate containing the identity, alert and resource request
//! contracts shared by every long-lived engine component.
//!
//! Nothing in this crate spawns threads. The broker that resolves requests
//! lives in `astra-control` and the logger that consumes alerts lives in
//! `astra-telemetry`; both plug in through the [`link::BrokerLink`] contract.

#![warn(missing_docs)]

pub mod alert;
pub mod asset;
pub mod link;
pub mod resource;

pub use alert::{AlertRecord, AlertState, Severity};
pub use asset::{Asset, AssetCore, AssetId};
pub use link::{BrokerLink, RequestSpec, Submission, Target};
pub use resource::{
    CancelToken, RequestState, ResourceAsk, ResourceError, ResourceHandle, ResourceId,
    ResourceKey, ResourceRequest, ResourceType,
};
