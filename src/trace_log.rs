//! Append-only trace log sink
//!
//! One plain-text line per recorded event. The file is opened once at
//! startup in truncate mode and never reopened; any later write failure is
//! treated as the handle having closed underneath us, which is fatal to the
//! caller rather than a silent drop.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{CollectorError, Result};
use crate::record::TraceRecord;

/// Trace log file handle, owned exclusively by the trace buffer
#[derive(Debug)]
pub struct TraceLog {
    writer: BufWriter<File>,
}

impl TraceLog {
    /// Open `path` for writing, truncating any previous contents.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| CollectorError::TraceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "trace log opened");
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Write one record line. Failure means the handle is gone and surfaces
    /// as `TraceClosed`.
    pub fn write_record(&mut self, record: &TraceRecord) -> Result<()> {
        writeln!(self.writer, "{record}")?;
        Ok(())
    }

    /// Push buffered bytes down to the file.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FunctionId;

    #[test]
    fn test_create_truncates_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");
        std::fs::write(&path, "stale line\n").unwrap();

        let mut log = TraceLog::create(&path).unwrap();
        log.write_record(&TraceRecord::enter(FunctionId(1), 10)).unwrap();
        log.sync().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "i 0x1 10\n");
    }

    #[test]
    fn test_open_failure_is_trace_open() {
        let err = TraceLog::create(Path::new("/nonexistent-dir/trace.log")).unwrap_err();
        assert!(matches!(err, CollectorError::TraceOpen { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_records_append_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");
        let mut log = TraceLog::create(&path).unwrap();

        log.write_record(&TraceRecord::enter(FunctionId(0x10), 1)).unwrap();
        log.write_record(&TraceRecord::exit(FunctionId(0x10), 2, 8)).unwrap();
        log.sync().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "i 0x10 1\no 0x10 2 8\n");
    }
}
