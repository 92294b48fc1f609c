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

//! Severity taxonomy and alert records.
//!
//! Every asset carries an [`AlertState`] and every call to
//! [`AssetCore::alert`](crate::AssetCore::alert) produces an [`AlertRecord`]
//! that travels to the logger worker.

mod record;
mod severity;

pub use record::{AlertRecord, TIMESTAMP_FORMAT};
pub use severity::Severity;

/// The local alert state of a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlertState {
    /// Whether an alert is currently raised.
    pub has_alert: bool,
    /// The severity of the current alert, [`Severity::None`] when clear.
    pub severity: Severity,
    /// The message of the current alert.
    pub message: String,
}

impl AlertState {
    /// Builds the state left behind by raising an alert.
    pub fn raised(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            has_alert: severity != Severity::None,
            severity,
            message: message.into(),
        }
    }

    /// Returns `true` if this state is a FATAL alert.
    pub fn is_fatal(&self) -> bool {
        self.severity.is_terminal()
    }
}
