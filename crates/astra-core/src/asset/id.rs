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

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A process-unique identifier for a live asset.
///
/// Identities are drawn from the random stream behind version 4 UUIDs. They
/// are not cryptographically unique, but a collision within one session is
/// improbable enough that the registry simply rejects one if it ever happens.
///
/// The raw value `0` is reserved for [`AssetId::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(u64);

impl AssetId {
    /// The identity of "no asset", used as the sender of unaddressable requests.
    pub const NONE: AssetId = AssetId(0);

    /// Draws a new random identity.
    pub fn generate() -> Self {
        loop {
            let (high, low) = Uuid::new_v4().as_u64_pair();
            let raw = high ^ low;
            if raw != 0 {
                return Self(raw);
            }
        }
    }

    /// Wraps a raw identity value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identity value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` for [`AssetId::NONE`].
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Default for AssetId {
    /// Draws a new random identity.
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
