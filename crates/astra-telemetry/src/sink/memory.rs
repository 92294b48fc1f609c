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
use astra_core::{AlertRecord, Severity};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct Flushed {
    records: Vec<AlertRecord>,
    batches: usize,
}

/// In-memory alert sink.
///
/// Clones share the same storage, so one clone can be handed to the logger
/// while another inspects what was flushed. Used by tests and by tools that
/// display recent alerts.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    storage: Arc<RwLock<Flushed>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record flushed so far, in order.
    pub fn records(&self) -> Vec<AlertRecord> {
        self.storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    /// Number of records flushed so far.
    pub fn len(&self) -> usize {
        self.storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    /// Returns `true` if nothing was flushed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of non-empty batches received.
    pub fn batches(&self) -> usize {
        self.storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .batches
    }

    /// Flushed records of the given severity.
    pub fn with_severity(&self, severity: Severity) -> Vec<AlertRecord> {
        self.storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .iter()
            .filter(|record| record.severity == severity)
            .cloned()
            .collect()
    }

    /// Forgets everything flushed so far.
    pub fn clear(&self) {
        let mut storage = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        storage.records.clear();
        storage.batches = 0;
    }
}

impl AlertSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write_batch(&mut self, records: &[AlertRecord]) -> Result<(), LoggerError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut storage = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        storage.records.extend_from_slice(records);
        storage.batches += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astra_core::AssetId;

    #[test]
    fn clones_share_storage() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        let record = AlertRecord::new(AssetId::NONE, "test", "hello", Severity::Warning);

        writer.write_batch(&[record.clone()]).unwrap();
        writer.write_batch(&[]).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.batches(), 1);
        assert_eq!(sink.with_severity(Severity::Warning), vec![record]);
        assert!(sink.with_severity(Severity::Info).is_empty());

        sink.clear();
        assert!(sink.is_empty());
    }
}
