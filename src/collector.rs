//! The collector context
//!
//! One `Collector` per instrumented process, constructed before user code
//! runs and finished after it returns. Every public entry point is a plain
//! `&mut self` method: the contract assumes a single instrumented thread, so
//! there is no internal locking — a multi-threaded deployment needs its own
//! synchronization around the context.
//!
//! Dispatch order per event: policy lookup (absent means record), filtering
//! (unconditional drop, no side effects at all), sampling (every Nth
//! enter/exit pair), then the side-channel lookup for exits and the buffer
//! append.

use std::path::Path;

use tracing::info;

use crate::buffer::TraceBuffer;
use crate::config::{CollectorConfig, PolicyTable};
use crate::error::Result;
use crate::parser::ConfigParser;
use crate::record::{FrameId, FunctionId, StructId, TraceRecord};
use crate::size_channel::{SizeChannel, SizeSource};

/// Instrumentation trace collector
#[derive(Debug)]
pub struct Collector {
    policies: PolicyTable,
    buffer: TraceBuffer,
    sizes: SizeChannel,
}

impl Collector {
    /// Parse the configuration at `path`, open the trace log, and reserve
    /// the record buffer. Ready before any instrumented code runs.
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let (config, policies) = ConfigParser::parse_file(path)?;
        Self::new(config, policies)
    }

    /// Build a collector from an already-populated configuration.
    pub fn new(config: CollectorConfig, policies: PolicyTable) -> Result<Self> {
        let buffer = TraceBuffer::new(&config)?;
        info!(
            policies = policies.len(),
            direct = buffer.is_direct(),
            "collector ready"
        );
        Ok(Self {
            policies,
            buffer,
            sizes: SizeChannel::new(),
        })
    }

    /// Function-enter hook. `now_us` is the caller-captured monotonic
    /// timestamp in microseconds.
    pub fn on_enter(&mut self, function: FunctionId, now_us: u64) -> Result<()> {
        if let Some(policy) = self.policies.get_mut(function) {
            if policy.is_filtered {
                return Ok(());
            }
            if policy.is_sampled {
                policy.sample_current += 1;
                if policy.sample_current != policy.sample_ratio {
                    return Ok(());
                }
            }
        }
        self.append(TraceRecord::enter(function, now_us))
    }

    /// Function-exit hook. `frame` is the call token the side channel saw
    /// for this call, used to pop the matching size record.
    pub fn on_exit(&mut self, function: FunctionId, frame: FrameId, now_us: u64) -> Result<()> {
        if let Some(policy) = self.policies.get_mut(function) {
            if policy.is_filtered {
                // Filtered functions never touch the side channel.
                return Ok(());
            }
            if policy.is_sampled {
                if policy.sample_current < policy.sample_ratio {
                    // Dropped exit still releases the pending size record so
                    // it cannot leak into an unrelated call.
                    self.sizes.remove_size_record(frame);
                    return Ok(());
                }
                policy.sample_current = 0;
            }
        }
        let size = self.sizes.get_size_record(frame);
        self.append(TraceRecord::exit(function, now_us, size))
    }

    /// Register a structure instance for size profiling.
    pub fn register(&mut self, struct_id: StructId, injected: bool, source: SizeSource) {
        self.sizes.register(struct_id, injected, source);
    }

    /// Register with a snapshotted size value.
    pub fn register_value(&mut self, struct_id: StructId, injected: bool, size: usize) {
        self.sizes.register_value(struct_id, injected, size);
    }

    /// Remove a size-profiling registration; unknown ids are a no-op.
    pub fn unregister(&mut self, struct_id: StructId) {
        self.sizes.unregister(struct_id);
    }

    /// Mark the current call as a size-profiling target.
    pub fn using(&mut self, struct_id: StructId, current: FrameId, caller: FrameId) {
        self.sizes.using(struct_id, current, caller);
    }

    /// Mark the current call as a size-profiling target, supplying the size
    /// explicitly.
    pub fn using_value(
        &mut self,
        struct_id: StructId,
        current: FrameId,
        caller: FrameId,
        size: usize,
    ) {
        self.sizes.using_value(struct_id, current, caller, size);
    }

    /// Sweep size records left behind by an unwound call subtree.
    pub fn clean_size_records(&mut self, frame: FrameId) {
        self.sizes.clean_size_records(frame);
    }

    /// Records currently buffered (always 0 in direct-output mode).
    pub fn buffered_records(&self) -> usize {
        self.buffer.len()
    }

    /// Size records currently pending on the side-channel stack.
    pub fn pending_size_records(&self) -> usize {
        self.sizes.depth()
    }

    /// Whether records bypass the buffer.
    pub fn is_direct_output(&self) -> bool {
        self.buffer.is_direct()
    }

    /// Final flush at process shutdown. A failure here means trace loss and
    /// carries the distinct trace-closed status.
    pub fn finish(mut self) -> Result<()> {
        let result = self.buffer.flush();
        if result.is_err() {
            self.clear_fatal();
        }
        result
    }

    fn append(&mut self, record: TraceRecord) -> Result<()> {
        let result = self.buffer.append(record);
        if result.is_err() {
            self.clear_fatal();
        }
        result
    }

    /// Drop all in-memory policy and buffer state so a fatal error never
    /// leaves misleading partial output behind.
    fn clear_fatal(&mut self) {
        self.buffer.clear();
        self.policies.clear();
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        // Best effort for hosts that never call finish(); errors can only
        // surface through the explicit path.
        let _ = self.buffer.flush();
    }
}
