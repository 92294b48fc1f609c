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

//! # Astra Control
//!
//! The broker side of the asset protocol. [`Broker`] keeps a registry of
//! weakly referenced assets, routes their alerts to the logger, and resolves
//! resource requests on a dedicated worker thread with a cache that
//! deduplicates identical asks.

#![warn(missing_docs)]

mod broker;
pub mod cache;
pub mod config;
pub mod error;
pub mod registry;
mod resolver;

pub use broker::{Broker, BROKER_NAME};
pub use cache::ResolvedCache;
pub use config::{CoreConfig, LOG_DIR_ENV};
pub use error::BrokerError;
pub use registry::AssetRegistry;
