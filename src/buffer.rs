//! Bounded in-memory record buffer with direct-output degradation
//!
//! Accepted records accumulate in an ordered `Vec` until a fixed cap, then
//! drain to the trace log in one pass. The flush happens before the append
//! that would hit the cap, so the just-created record is never lost. If
//! buffering ever becomes infeasible (configured off, or a failed growth
//! after one flush-and-retry), every record goes straight to the log for the
//! rest of the process.

use tracing::{debug, warn};

use crate::config::{CollectorConfig, DEFAULT_BUFFER_CAPACITY};
use crate::error::Result;
use crate::record::TraceRecord;
use crate::trace_log::TraceLog;

/// Records held before an automatic flush, independent of the configured
/// capacity hint.
pub const MAX_BUFFERED_RECORDS: usize = 19_998;

/// Ordered record buffer owning the trace log handle
#[derive(Debug)]
pub struct TraceBuffer {
    records: Vec<TraceRecord>,
    log: TraceLog,
    direct_output: bool,
}

impl TraceBuffer {
    /// Open the trace log and reserve the initial capacity. An oversized
    /// capacity hint falls back to the default reservation; if even that
    /// fails the buffer starts out in direct mode.
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        let log = TraceLog::create(&config.trace_file_name)?;
        let mut buffer = Self {
            records: Vec::new(),
            log,
            direct_output: config.use_direct_output,
        };
        if !buffer.direct_output && buffer.records.try_reserve(config.buffer_init_capacity).is_err()
        {
            warn!(
                requested = config.buffer_init_capacity,
                "initial buffer reservation failed, retrying with the default"
            );
            if buffer.records.try_reserve(DEFAULT_BUFFER_CAPACITY).is_err() {
                buffer.direct_output = true;
                warn!("default buffer reservation failed, starting in direct output");
            }
        }
        Ok(buffer)
    }

    /// Append one record, flushing first when the cap is reached. In direct
    /// mode the record goes straight to the log instead.
    pub fn append(&mut self, record: TraceRecord) -> Result<()> {
        if self.direct_output {
            return self.write_direct(&record);
        }

        if self.records.len() >= MAX_BUFFERED_RECORDS {
            self.flush()?;
        }

        if self.records.try_reserve(1).is_err() {
            // Growth failed: flush what we have, shrink, and retry once
            // before giving up on buffering for the rest of the process.
            self.flush()?;
            self.records.shrink_to_fit();
            if self.records.try_reserve(1).is_err() {
                self.direct_output = true;
                warn!("buffer growth failed, degrading to direct output permanently");
                return self.write_direct(&record);
            }
        }

        self.records.push(record);
        Ok(())
    }

    /// Drain every buffered record to the log in order and clear the buffer.
    pub fn flush(&mut self) -> Result<()> {
        let drained = self.records.len();
        for record in &self.records {
            self.log.write_record(record)?;
        }
        self.records.clear();
        if drained > 0 {
            debug!(records = drained, "trace buffer flushed");
        }
        self.log.sync()
    }

    fn write_direct(&mut self, record: &TraceRecord) -> Result<()> {
        self.log.write_record(record)?;
        self.log.sync()
    }

    /// Records currently buffered (always 0 in direct mode).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether records bypass the buffer.
    pub fn is_direct(&self) -> bool {
        self.direct_output
    }

    /// Discard buffered records without writing them. Fatal-path cleanup
    /// only; normal shutdown goes through `flush`.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FunctionId;
    use std::path::PathBuf;

    fn config_at(dir: &tempfile::TempDir, direct: bool) -> CollectorConfig {
        CollectorConfig {
            trace_file_name: dir.path().join("trace.log"),
            buffer_init_capacity: 64,
            use_direct_output: direct,
        }
    }

    fn line_count(path: &PathBuf) -> usize {
        std::fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn test_buffered_records_stay_in_memory_until_flush() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = TraceBuffer::new(&config_at(&dir, false)).unwrap();

        for i in 0..10 {
            buffer.append(TraceRecord::enter(FunctionId(1), i)).unwrap();
        }
        assert_eq!(buffer.len(), 10);
        assert_eq!(line_count(&dir.path().join("trace.log")), 0);

        buffer.flush().unwrap();
        assert!(buffer.is_empty());
        assert_eq!(line_count(&dir.path().join("trace.log")), 10);
    }

    #[test]
    fn test_direct_mode_never_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = TraceBuffer::new(&config_at(&dir, true)).unwrap();
        assert!(buffer.is_direct());

        for i in 0..5 {
            buffer.append(TraceRecord::enter(FunctionId(2), i)).unwrap();
            assert_eq!(buffer.len(), 0);
        }
        assert_eq!(line_count(&dir.path().join("trace.log")), 5);
    }

    #[test]
    fn test_cap_triggers_exactly_one_flush_before_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = TraceBuffer::new(&config_at(&dir, false)).unwrap();
        let path = dir.path().join("trace.log");

        for i in 0..MAX_BUFFERED_RECORDS as u64 {
            buffer.append(TraceRecord::enter(FunctionId(3), i)).unwrap();
        }
        assert_eq!(buffer.len(), MAX_BUFFERED_RECORDS);
        assert_eq!(line_count(&path), 0);

        // The append that would exceed the cap flushes first, then buffers
        // the new record.
        buffer
            .append(TraceRecord::enter(FunctionId(3), MAX_BUFFERED_RECORDS as u64))
            .unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(line_count(&path), MAX_BUFFERED_RECORDS);

        buffer.flush().unwrap();
        assert_eq!(line_count(&path), MAX_BUFFERED_RECORDS + 1);
    }

    #[test]
    fn test_order_survives_cap_flush() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = TraceBuffer::new(&config_at(&dir, false)).unwrap();
        let path = dir.path().join("trace.log");

        let total = MAX_BUFFERED_RECORDS as u64 + 17;
        for i in 0..total {
            buffer.append(TraceRecord::enter(FunctionId(4), i)).unwrap();
        }
        buffer.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let timestamps: Vec<u64> = contents
            .lines()
            .map(|l| l.split_whitespace().nth(2).unwrap().parse().unwrap())
            .collect();
        assert_eq!(timestamps.len(), total as usize);
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_flush_on_empty_buffer_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = TraceBuffer::new(&config_at(&dir, false)).unwrap();
        buffer.flush().unwrap();
        buffer.flush().unwrap();
        assert_eq!(line_count(&dir.path().join("trace.log")), 0);
    }

    #[test]
    fn test_open_failure_surfaces_before_buffering() {
        let config = CollectorConfig {
            trace_file_name: PathBuf::from("/nonexistent-dir/trace.log"),
            ..CollectorConfig::default()
        };
        let err = TraceBuffer::new(&config).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
