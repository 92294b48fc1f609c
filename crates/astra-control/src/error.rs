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

//! Error types for the broker.

use astra_core::AssetId;
use astra_telemetry::LoggerError;
use thiserror::Error;

/// An error raised by [`Broker`](crate::Broker) operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Another live asset is already registered under this identity.
    #[error("identity {id} is already registered to '{name}'")]
    DuplicateIdentity {
        /// The contested identity.
        id: AssetId,
        /// Display name of the asset holding it.
        name: String,
    },
    /// No asset is registered under this identity.
    #[error("no asset is registered under identity {0}")]
    UnknownAsset(AssetId),
    /// A replacement asset carries a different identity than the entry it
    /// should replace.
    #[error("cannot re-point identity {expected} at an asset with identity {found}")]
    IdentityMismatch {
        /// The registered identity.
        expected: AssetId,
        /// The identity of the replacement.
        found: AssetId,
    },
    /// The resolver thread could not be started.
    #[error("failed to spawn the resolver thread")]
    Spawn(#[source] std::io::Error),
    /// The logger could not be started.
    #[error(transparent)]
    Logger(#[from] LoggerError),
}
