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

use super::AlertSink;
use crate::error::LoggerError;
use astra_core::AlertRecord;

/// Log target used for every alert line on the diagnostic stream.
pub const ALERT_TARGET: &str = "astra::alert";

/// Emits alert lines through the `log` facade.
///
/// The level follows the severity: INFO-like records at `info`, WARNING at
/// `warn`, CRITICAL and FATAL at `error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl AlertSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn write_batch(&mut self, records: &[AlertRecord]) -> Result<(), LoggerError> {
        for record in records {
            log::log!(target: ALERT_TARGET, record.severity.log_level(), "{}", record.render());
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LoggerError> {
        log::logger().flush();
        Ok(())
    }
}
