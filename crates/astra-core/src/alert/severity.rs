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

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered alert level, from [`Severity::None`] to [`Severity::Fatal`].
///
/// `Banner` is a side channel for human readable milestones (startup and
/// shutdown banners) rather than a true error level. `Fatal` is terminal: an
/// asset that raised it can never reset its alert, and the broker stops
/// scheduling work once it has seen one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// No alert.
    #[default]
    None,
    /// Routine information, buffered until the logger flushes.
    Info,
    /// Information that must reach the log immediately.
    InfoUrgent,
    /// A milestone line printed verbatim.
    Banner,
    /// A recoverable problem.
    Warning,
    /// A serious problem the component could still survive.
    Critical,
    /// An unrecoverable failure.
    Fatal,
}

impl Severity {
    /// Every severity, in ascending order.
    pub const ALL: [Severity; 7] = [
        Severity::None,
        Severity::Info,
        Severity::InfoUrgent,
        Severity::Banner,
        Severity::Warning,
        Severity::Critical,
        Severity::Fatal,
    ];

    /// The upper-case name used in log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Info => "INFO",
            Severity::InfoUrgent => "INFO_URGENT",
            Severity::Banner => "BANNER",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Fatal => "FATAL",
        }
    }

    /// Returns `true` if a record of this severity must be flushed at once.
    pub const fn forces_flush(self) -> bool {
        matches!(
            self,
            Severity::InfoUrgent
                | Severity::Banner
                | Severity::Warning
                | Severity::Critical
                | Severity::Fatal
        )
    }

    /// Returns `true` for the sticky, non-resettable level.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Severity::Fatal)
    }

    /// The `log` level a record of this severity is emitted at.
    pub const fn log_level(self) -> log::Level {
        match self {
            Severity::None => log::Level::Debug,
            Severity::Info | Severity::InfoUrgent | Severity::Banner => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Critical | Severity::Fatal => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_are_ordered() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} should be below {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn only_plain_info_is_buffered() {
        let buffered: Vec<_> = Severity::ALL
            .into_iter()
            .filter(|s| *s != Severity::None && !s.forces_flush())
            .collect();
        assert_eq!(buffered, vec![Severity::Info]);
    }

    #[test]
    fn only_fatal_is_terminal() {
        assert!(Severity::Fatal.is_terminal());
        assert!(Severity::ALL[..6].iter().all(|s| !s.is_terminal()));
    }

    #[test]
    fn names_round_trip_through_serde() {
        let json = serde_json::to_string(&Severity::InfoUrgent).unwrap();
        assert_eq!(json, "\"INFO_URGENT\"");
        let parsed: Severity = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(parsed, Severity::Critical);
    }
}
