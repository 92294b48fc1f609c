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

//! Errors raised by the alert pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// An error raised by the logger or one of its sinks.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The log artifact could not be created or written.
    #[error("failed to write log file '{}'", path.display())]
    Io {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The logger thread could not be started.
    #[error("failed to spawn the logger thread")]
    Spawn(#[source] io::Error),
}
