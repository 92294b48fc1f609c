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
use astra_core::alert::TIMESTAMP_FORMAT;
use astra_core::AlertRecord;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends alert lines to a human-readable log file.
///
/// Nothing touches the disk until the first batch: the containing directory
/// is created then, and a session header is written before the first line of
/// the run.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Creates a sink appending to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    /// The file this sink appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, LoggerError> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => open_session(&self.path).map_err(|source| LoggerError::Io {
                path: self.path.clone(),
                source,
            })?,
        };
        Ok(self.writer.insert(writer))
    }
}

fn open_session(path: &Path) -> std::io::Result<BufWriter<File>> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(
        writer,
        "==== session started {} (pid {}) ====",
        Local::now().format(TIMESTAMP_FORMAT),
        std::process::id()
    )?;
    Ok(writer)
}

impl AlertSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn write_batch(&mut self, records: &[AlertRecord]) -> Result<(), LoggerError> {
        let path = self.path.clone();
        let writer = self.writer()?;
        let io = |source| LoggerError::Io {
            path: path.clone(),
            source,
        };
        for record in records {
            writeln!(writer, "{}", record.render()).map_err(io)?;
        }
        writer.flush().map_err(io)
    }

    fn flush(&mut self) -> Result<(), LoggerError> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush().map_err(|source| LoggerError::Io {
                path: self.path.clone(),
                source,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astra_core::{AssetId, Severity};

    fn record(message: &str, severity: Severity) -> AlertRecord {
        AlertRecord::new(AssetId::from_raw(0x42), "Renderer", message, severity)
    }

    #[test]
    fn nothing_is_created_before_the_first_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("astra.log");
        let _sink = FileSink::new(&path);
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }

    #[test]
    fn writes_header_once_then_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("astra.log");
        let mut sink = FileSink::new(&path);

        sink.write_batch(&[record("first", Severity::Info)]).unwrap();
        sink.write_batch(&[
            record("=== banner ===", Severity::Banner),
            record("second", Severity::Warning),
        ])
        .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("==== session started "));
        assert!(lines[1].starts_with("[INFO | "));
        assert!(lines[1].ends_with("Renderer \"0000000000000042\" => first"));
        assert_eq!(lines[2], "=== banner ===");
        assert!(lines[3].starts_with("[WARNING | "));
    }

    #[test]
    fn appends_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astra.log");

        FileSink::new(&path)
            .write_batch(&[record("run one", Severity::Info)])
            .unwrap();
        FileSink::new(&path)
            .write_batch(&[record("run two", Severity::Info)])
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("==== session started").count(), 2);
        assert!(contents.contains("run one"));
        assert!(contents.contains("run two"));
    }
}
