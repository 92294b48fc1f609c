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

use super::Severity;
use crate::asset::AssetId;
use chrono::{DateTime, Local};
use std::fmt;

/// Timestamp layout used in every rendered alert line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A single alert raised by an asset, on its way to the logger.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    /// Identity of the asset that raised the alert.
    pub caller_id: AssetId,
    /// Display name of the asset that raised the alert.
    pub caller_name: String,
    /// Free-form alert message.
    pub message: String,
    /// Alert level.
    pub severity: Severity,
    /// Wall-clock time at which the alert was raised.
    pub timestamp: DateTime<Local>,
}

impl AlertRecord {
    /// Creates a record stamped with the current local time.
    pub fn new(
        caller_id: AssetId,
        caller_name: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            caller_id,
            caller_name: caller_name.into(),
            message: message.into(),
            severity,
            timestamp: Local::now(),
        }
    }

    /// Renders the record the way it appears in the log artifact.
    ///
    /// `Banner` records are rendered verbatim, without the structured prefix.
    pub fn render(&self) -> String {
        if self.severity == Severity::Banner {
            self.message.clone()
        } else {
            self.to_string()
        }
    }

    /// Emits the record straight through the `log` facade.
    ///
    /// Used when no logger worker is reachable, e.g. an asset that outlived
    /// its broker.
    pub fn emit_direct(&self) {
        log::log!(target: "astra::alert", self.severity.log_level(), "{}", self.render());
    }
}

impl fmt::Display for AlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} | {}] {} \"{}\" => {}",
            self.severity,
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.caller_name,
            self.caller_id,
            self.message
        )
    }
}
