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

//! Logger configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Number of buffered records that forces a flush by default.
pub const DEFAULT_FLUSH_LIMIT: usize = 5;

/// Configuration for the [`Logger`](crate::Logger).
///
/// Both flags are meant to be decided once, at process start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Persist flushed records to `log_dir/file_name`.
    pub enable_file_logging: bool,
    /// Allow the logger to terminate the process after flushing a FATAL
    /// record.
    pub exit_rights_granted: bool,
    /// Directory of the log artifact. Created on first write.
    pub log_dir: PathBuf,
    /// File name of the log artifact.
    pub file_name: String,
    /// Number of buffered records that forces a flush. Values below 1 are
    /// treated as 1.
    pub flush_limit: usize,
}

impl LoggerConfig {
    /// Full path of the log artifact.
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.file_name)
    }

    /// The effective flush threshold.
    pub fn effective_flush_limit(&self) -> usize {
        self.flush_limit.max(1)
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enable_file_logging: false,
            exit_rights_granted: false,
            log_dir: PathBuf::from("logs"),
            file_name: "astra.log".to_string(),
            flush_limit: DEFAULT_FLUSH_LIMIT,
        }
    }
}
