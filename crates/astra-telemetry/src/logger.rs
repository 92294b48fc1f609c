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

//! The logger worker: buffers alert records and flushes them to the sinks.

use crate::config::LoggerConfig;
use crate::error::LoggerError;
use crate::sink::{AlertSink, ConsoleSink, FileSink};
use astra_core::{AlertRecord, Severity};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Exit status of a process terminated by a FATAL alert.
pub const FATAL_EXIT_CODE: i32 = 1;

enum LogCommand {
    Record(AlertRecord),
    Flush(flume::Sender<()>),
    Sync(flume::Sender<usize>),
    Shutdown,
}

/// A cheap, cloneable handle for feeding records to a running [`Logger`].
#[derive(Debug, Clone)]
pub struct AlertSender {
    sender: flume::Sender<LogCommand>,
    fatal: Arc<AtomicBool>,
}

impl AlertSender {
    /// Queues a record for the logger thread.
    ///
    /// If the logger is gone the record is emitted directly through `log`.
    pub fn enqueue(&self, record: AlertRecord) {
        if record.severity.is_terminal() {
            self.fatal.store(true, Ordering::SeqCst);
        }
        if let Err(flume::SendError(LogCommand::Record(record))) =
            self.sender.send(LogCommand::Record(record))
        {
            log::trace!("Logger is stopped, emitting alert directly.");
            record.emit_direct();
        }
    }

    /// Returns `true` once a FATAL record went through this logger.
    pub fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::SeqCst)
    }
}

/// The background alert logger.
///
/// Records are buffered on the logger thread. The buffer is flushed to every
/// sink as soon as a record with a [`forcing`](Severity::forces_flush)
/// severity arrives or the buffer reaches the configured flush limit. The
/// first FATAL record latches the logger's fatal bit; with exit rights granted
/// the logger flushes and terminates the process with [`FATAL_EXIT_CODE`].
pub struct Logger {
    sender: AlertSender,
    handle: Option<thread::JoinHandle<()>>,
}

impl Logger {
    /// Starts a logger with the sinks implied by `config`: the console, plus
    /// the log file when file logging is enabled.
    pub fn start(config: LoggerConfig) -> Result<Self, LoggerError> {
        let mut sinks: Vec<Box<dyn AlertSink>> = vec![Box::new(ConsoleSink)];
        if config.enable_file_logging {
            sinks.push(Box::new(FileSink::new(config.log_path())));
        }
        Self::with_sinks(config, sinks)
    }

    /// Starts a logger writing to exactly `sinks`.
    pub fn with_sinks(
        config: LoggerConfig,
        sinks: Vec<Box<dyn AlertSink>>,
    ) -> Result<Self, LoggerError> {
        let (tx, rx) = flume::unbounded();
        let fatal = Arc::new(AtomicBool::new(false));
        let worker = LoggerWorker {
            flush_limit: config.effective_flush_limit(),
            exit_rights: config.exit_rights_granted,
            buffer: Vec::with_capacity(config.effective_flush_limit()),
            sinks,
            fatal_seen: false,
        };

        let handle = thread::Builder::new()
            .name("astra-logger".to_string())
            .spawn(move || worker.run(rx))
            .map_err(LoggerError::Spawn)?;

        log::debug!(
            "Logger started (file logging: {}, exit rights: {}).",
            config.enable_file_logging,
            config.exit_rights_granted
        );

        Ok(Self {
            sender: AlertSender { sender: tx, fatal },
            handle: Some(handle),
        })
    }

    /// Queues a record.
    pub fn enqueue(&self, record: AlertRecord) {
        self.sender.enqueue(record);
    }

    /// Returns a handle other components can enqueue through.
    pub fn sender(&self) -> AlertSender {
        self.sender.clone()
    }

    /// Flushes everything queued so far and waits for the sinks.
    pub fn flush(&self) {
        let (ack, done) = flume::bounded(1);
        if self.sender.sender.send(LogCommand::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }

    /// Waits until the logger processed everything queued so far and returns
    /// the number of records still buffered.
    pub fn sync(&self) -> usize {
        let (ack, done) = flume::bounded(1);
        if self.sender.sender.send(LogCommand::Sync(ack)).is_err() {
            return 0;
        }
        done.recv().unwrap_or(0)
    }

    /// Returns `true` once a FATAL record was enqueued.
    pub fn is_fatal(&self) -> bool {
        self.sender.is_fatal()
    }

    /// Flushes the remaining records and stops the logger thread.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.sender.sender.send(LogCommand::Shutdown);
            if handle.join().is_err() {
                log::error!("Logger thread panicked.");
            }
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct LoggerWorker {
    flush_limit: usize,
    exit_rights: bool,
    buffer: Vec<AlertRecord>,
    sinks: Vec<Box<dyn AlertSink>>,
    fatal_seen: bool,
}

impl LoggerWorker {
    fn run(mut self, commands: flume::Receiver<LogCommand>) {
        log::trace!("Logger thread started.");

        while let Ok(command) = commands.recv() {
            match command {
                LogCommand::Record(record) => self.accept(record),
                LogCommand::Flush(ack) => {
                    self.flush();
                    self.flush_sinks();
                    let _ = ack.send(());
                }
                LogCommand::Sync(ack) => {
                    let _ = ack.send(self.buffer.len());
                }
                LogCommand::Shutdown => break,
            }
        }

        self.flush();
        self.flush_sinks();
        log::trace!("Logger thread stopped.");
    }

    fn accept(&mut self, record: AlertRecord) {
        let severity = record.severity;
        self.buffer.push(record);

        if severity.forces_flush() || self.buffer.len() >= self.flush_limit {
            self.flush();
        }

        if severity == Severity::Fatal && !self.fatal_seen {
            self.fatal_seen = true;
            if self.exit_rights {
                self.terminate();
            }
        }
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.buffer);
        for sink in &mut self.sinks {
            if let Err(e) = sink.write_batch(&batch) {
                log::error!("Alert sink '{}' failed: {e}", sink.name());
            }
        }
    }

    fn flush_sinks(&mut self) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                log::error!("Alert sink '{}' failed to flush: {e}", sink.name());
            }
        }
    }

    fn terminate(&mut self) -> ! {
        self.flush_sinks();
        log::error!("FATAL alert with exit rights granted, terminating.");
        log::logger().flush();
        std::process::exit(FATAL_EXIT_CODE)
    }
}
