//! Collector failure taxonomy and process exit statuses
//!
//! Every fatal condition maps to a distinct non-zero exit status so the
//! harness driving the instrumented program can tell configuration trouble
//! apart from trace-output trouble. Buffer growth failure is deliberately
//! absent: it degrades the collector to direct output instead of failing.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can take the collector down
#[derive(Error, Debug)]
pub enum CollectorError {
    /// The trace log could not be created at startup.
    #[error("failed to open trace log {path}: {source}")]
    TraceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A write to an already-open trace log failed. Silent data loss is
    /// unacceptable, so this is fatal wherever it surfaces.
    #[error("trace log closed unexpectedly: {0}")]
    TraceClosed(#[from] io::Error),

    /// The configuration file could not be read at all.
    #[error("configuration file not found: {path}")]
    ConfigMissing { path: PathBuf },

    /// Any lexical, grammatical, type, value, or duplicate-section violation
    /// in the configuration text.
    #[error("configuration syntax error: {0}")]
    ConfigSyntax(String),
}

/// Result type for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;

impl CollectorError {
    /// Distinct process exit status for this failure class. A host converts
    /// exactly once, at top level.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TraceOpen { .. } => 1,
            Self::TraceClosed(_) => 2,
            Self::ConfigMissing { .. } => 11,
            Self::ConfigSyntax(_) => 12,
        }
    }
}
