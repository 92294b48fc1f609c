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

//! Process-level configuration.

use anyhow::Context;
use astra_telemetry::LoggerConfig;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable overriding [`LoggerConfig::log_dir`].
pub const LOG_DIR_ENV: &str = "ASTRA_LOG_DIR";

/// Configuration handed to [`Broker::start`](crate::Broker::start).
///
/// Every field has a default, so `{}` is a valid configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Settings of the alert logger.
    pub logger: LoggerConfig,
}

impl CoreConfig {
    /// Reads a JSON configuration file and applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("failed to load config file '{}'", path.display()))
    }

    /// Parses a JSON configuration and applies environment overrides.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let mut config: Self =
            serde_json::from_str(json).context("invalid core configuration")?;
        config.override_log_dir(std::env::var_os(LOG_DIR_ENV));
        Ok(config)
    }

    /// Replaces the log directory when `dir` is set and non-empty.
    pub fn override_log_dir(&mut self, dir: Option<OsString>) {
        if let Some(dir) = dir.filter(|dir| !dir.is_empty()) {
            log::debug!("Log directory overridden by {LOG_DIR_ENV}: {dir:?}");
            self.logger.log_dir = PathBuf::from(dir);
        }
    }
}
