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

//! Destinations for flushed alert records.

mod console;
mod file;
mod memory;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use memory::MemorySink;

use crate::error::LoggerError;
use astra_core::AlertRecord;
use std::fmt::Debug;

/// Trait defining the interface for alert sinks.
///
/// Sinks are owned by the logger thread and receive each flushed batch in
/// order.
pub trait AlertSink: Send + Debug + 'static {
    /// A short name used in diagnostics.
    fn name(&self) -> &str;

    /// Writes one flushed batch.
    fn write_batch(&mut self, records: &[AlertRecord]) -> Result<(), LoggerError>;

    /// Pushes any buffered output to its destination.
    fn flush(&mut self) -> Result<(), LoggerError> {
        Ok(())
    }
}
