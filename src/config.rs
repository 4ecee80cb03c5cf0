//! Collector configuration store
//!
//! Typed record of collector settings plus the per-function policy table the
//! dispatcher consults on every event. Pure data: the parser populates it
//! once at startup, and only the sampling counters mutate afterwards.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::record::FunctionId;

/// Trace log file name used when the configuration does not name one.
pub const DEFAULT_TRACE_FILE: &str = "trace.log";

/// Initial record-buffer capacity used when the configuration does not
/// specify `internal_storage_size`.
pub const DEFAULT_BUFFER_CAPACITY: usize = 20_000;

/// Collector settings loaded from the configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Trace log path (`internal_data_filename`).
    pub trace_file_name: PathBuf,
    /// Initial buffer capacity hint (`internal_storage_size`).
    pub buffer_init_capacity: usize,
    /// Skip buffering and write every record straight to the log
    /// (`internal_direct_output`).
    pub use_direct_output: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            trace_file_name: PathBuf::from(DEFAULT_TRACE_FILE),
            buffer_init_capacity: DEFAULT_BUFFER_CAPACITY,
            use_direct_output: false,
        }
    }
}

/// Recording policy for a single instrumented function
///
/// Filtering takes precedence over sampling. The `sample_current` counter is
/// shared across recursion depths of the same function, so a self-recursive
/// function keeps the plain run-of-N cadence of its outermost calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionPolicy {
    /// Drop every event for this function.
    pub is_filtered: bool,
    /// Record only every `sample_ratio`-th enter/exit pair.
    pub is_sampled: bool,
    /// Running counter, incremented per enter, reset after a recorded exit.
    pub sample_current: u64,
    /// The N in every-Nth-call sampling.
    pub sample_ratio: u64,
}

impl FunctionPolicy {
    /// Policy that drops every event.
    pub fn filtered() -> Self {
        Self {
            is_filtered: true,
            ..Self::default()
        }
    }

    /// Policy that records every `ratio`-th call.
    pub fn sampled(ratio: u64) -> Self {
        Self {
            is_sampled: true,
            sample_ratio: ratio,
            ..Self::default()
        }
    }
}

/// Per-function policy table keyed by function identity
///
/// A function with no entry is always recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTable {
    entries: HashMap<FunctionId, FunctionPolicy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, function: FunctionId) -> Option<&FunctionPolicy> {
        self.entries.get(&function)
    }

    pub fn get_mut(&mut self, function: FunctionId) -> Option<&mut FunctionPolicy> {
        self.entries.get_mut(&function)
    }

    /// Mark `function` as filtered. Filter entries win: any earlier policy
    /// for the identity is overwritten.
    pub fn add_filter(&mut self, function: FunctionId) {
        self.entries.insert(function, FunctionPolicy::filtered());
    }

    /// Mark `function` as sampled with the given ratio. Sampling never
    /// displaces an existing policy, and a ratio of 0 or 1 records every
    /// call anyway, so no entry is created for those.
    pub fn add_sample(&mut self, function: FunctionId, ratio: u64) {
        if ratio <= 1 {
            return;
        }
        self.entries
            .entry(function)
            .or_insert_with(|| FunctionPolicy::sampled(ratio));
    }

    /// Drop every entry. Used on the fatal paths so a failed collector never
    /// leaves a partially populated table behind.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CollectorConfig::default();
        assert_eq!(config.trace_file_name, PathBuf::from("trace.log"));
        assert_eq!(config.buffer_init_capacity, 20_000);
        assert!(!config.use_direct_output);
    }

    #[test]
    fn test_absent_function_has_no_policy() {
        let table = PolicyTable::new();
        assert!(table.get(FunctionId(0x1234)).is_none());
    }

    #[test]
    fn test_filter_overwrites_sample() {
        let mut table = PolicyTable::new();
        table.add_sample(FunctionId(1), 5);
        table.add_filter(FunctionId(1));

        let policy = table.get(FunctionId(1)).unwrap();
        assert!(policy.is_filtered);
        assert!(!policy.is_sampled);
    }

    #[test]
    fn test_sample_does_not_displace_filter() {
        let mut table = PolicyTable::new();
        table.add_filter(FunctionId(1));
        table.add_sample(FunctionId(1), 5);

        let policy = table.get(FunctionId(1)).unwrap();
        assert!(policy.is_filtered);
        assert!(!policy.is_sampled);
    }

    #[test]
    fn test_sample_ratio_of_one_creates_no_entry() {
        let mut table = PolicyTable::new();
        table.add_sample(FunctionId(1), 1);
        table.add_sample(FunctionId(2), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_sample_entry_starts_at_zero() {
        let mut table = PolicyTable::new();
        table.add_sample(FunctionId(1), 3);

        let policy = table.get(FunctionId(1)).unwrap();
        assert!(policy.is_sampled);
        assert_eq!(policy.sample_current, 0);
        assert_eq!(policy.sample_ratio, 3);
    }

    #[test]
    fn test_clear_empties_the_table() {
        let mut table = PolicyTable::new();
        table.add_filter(FunctionId(1));
        table.add_sample(FunctionId(2), 4);
        assert_eq!(table.len(), 2);

        table.clear();
        assert!(table.is_empty());
    }
}
