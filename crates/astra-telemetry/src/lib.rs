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

//! # Astra Telemetry
//!
//! The alert pipeline: a background logger that buffers [`AlertRecord`]s,
//! flushes them to a set of [`AlertSink`]s once a severity or count threshold
//! is hit, and can terminate the process on a FATAL alert.
//!
//! [`AlertRecord`]: astra_core::AlertRecord

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logger;
pub mod sink;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use logger::{AlertSender, Logger, FATAL_EXIT_CODE};
pub use sink::{AlertSink, ConsoleSink, FileSink, MemorySink};
