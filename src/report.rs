//! Per-file outcomes and the run-level summary.

use std::fmt;
use std::path::PathBuf;

/// Terminal state of one discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Stamped and written back in its original format.
    Stamped,
    /// Narrower than `minWidth`; left untouched on purpose.
    SkippedTooSmall {
        /// Width of the image in pixels.
        width: u32,
    },
    /// The file could not be decoded or has no readable dimensions.
    DecodeError(String),
    /// Stamping, encoding or writing failed after a successful decode.
    ProcessError(String),
}

impl FileOutcome {
    /// Whether this outcome counts as an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::DecodeError(_) | Self::ProcessError(_))
    }
}

/// One visited file and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path of the visited file.
    pub path: PathBuf,
    /// Its terminal state.
    pub outcome: FileOutcome,
}

/// Counters and details for one watermarking run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Files stamped and written back.
    pub processed: usize,
    /// Files skipped as too small.
    pub skipped: usize,
    /// Files that failed to decode or process.
    pub errors: usize,
    /// Every visited file, in visit order.
    pub files: Vec<FileRecord>,
    /// Run-level failure that stopped the run before any file was touched.
    pub fatal: Option<String>,
    /// Set when the run was stopped early by a cancellation signal.
    pub cancelled: bool,
}

impl RunReport {
    /// A report for a run that never started.
    #[must_use]
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            fatal: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Add one file's outcome to the counters.
    pub fn record(&mut self, path: PathBuf, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Stamped => self.processed += 1,
            FileOutcome::SkippedTooSmall { .. } => self.skipped += 1,
            FileOutcome::DecodeError(_) | FileOutcome::ProcessError(_) => self.errors += 1,
        }
        self.files.push(FileRecord { path, outcome });
    }

    /// Files that ended in an error.
    pub fn failures(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(|r| r.outcome.is_error())
    }

    /// Files skipped as too small.
    pub fn skips(&self) -> impl Iterator<Item = &FileRecord> {
        self.files
            .iter()
            .filter(|r| matches!(r.outcome, FileOutcome::SkippedTooSmall { .. }))
    }

    /// Whether the run finished without a fatal warning or any file error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fatal.is_none() && self.errors == 0
    }

    /// One-line human summary, omitting zero counts.
    #[must_use]
    pub fn summary(&self) -> String {
        if let Some(reason) = &self.fatal {
            return format!("Watermarking skipped: {reason}");
        }
        let mut line = format!("Watermarked {} images", self.processed);
        if self.skipped > 0 {
            line.push_str(&format!(", skipped {} (too small)", self.skipped));
        }
        if self.errors > 0 {
            line.push_str(&format!(", {} errors", self.errors));
        }
        if self.cancelled {
            line.push_str(" (cancelled)");
        }
        line
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_skips_and_errors_apart() {
        let mut report = RunReport::default();
        report.record("a.jpg".into(), FileOutcome::Stamped);
        report.record("b.jpg".into(), FileOutcome::SkippedTooSmall { width: 200 });
        report.record("c.jpg".into(), FileOutcome::DecodeError("bad header".into()));
        report.record("d.jpg".into(), FileOutcome::ProcessError("disk full".into()));

        assert_eq!((report.processed, report.skipped, report.errors), (1, 1, 2));
        assert_eq!(report.skips().count(), 1);
        let failed: Vec<_> = report.failures().map(|r| r.path.clone()).collect();
        assert_eq!(failed, vec![PathBuf::from("c.jpg"), PathBuf::from("d.jpg")]);
        assert!(!report.is_clean());
    }

    #[test]
    fn summary_omits_zero_counts() {
        let mut report = RunReport::default();
        report.record("a.jpg".into(), FileOutcome::Stamped);
        assert_eq!(report.summary(), "Watermarked 1 images");

        report.record("b.jpg".into(), FileOutcome::SkippedTooSmall { width: 10 });
        report.record("c.jpg".into(), FileOutcome::DecodeError("x".into()));
        assert_eq!(
            report.summary(),
            "Watermarked 1 images, skipped 1 (too small), 1 errors"
        );
    }

    #[test]
    fn aborted_report_is_not_clean() {
        let report = RunReport::aborted("glyph missing");
        assert_eq!(report.processed, 0);
        assert!(!report.is_clean());
        assert!(report.to_string().contains("glyph missing"));
    }
}
