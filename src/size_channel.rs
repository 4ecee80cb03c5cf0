//! Structure-size side channel
//!
//! Programs that opt into size profiling register a structure instance with a
//! size source, then mark each profiled call with `using`/`using_value`. That
//! pushes a `{call token, size}` record onto a process-wide LIFO stack, and
//! the matching function exit pops it back off. The registration's
//! `injected` flag says whether the marking call happens inside the profiled
//! method (match the caller's token) or right before it (match the immediate
//! one).
//!
//! Unknown structure ids are no-ops everywhere, never errors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::record::{FrameId, StructId};

/// Where a registered structure's size comes from
#[derive(Debug, Clone)]
pub enum SizeSource {
    /// Snapshot refreshed by each `using_value` call.
    Value(usize),
    /// Read live at each `using`; the instrumented program keeps the other
    /// handle and updates it as the structure grows and shrinks.
    Shared(Arc<AtomicUsize>),
}

impl SizeSource {
    fn current(&self) -> usize {
        match self {
            SizeSource::Value(size) => *size,
            SizeSource::Shared(cell) => cell.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
struct Registration {
    injected: bool,
    source: SizeSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SizeStackRecord {
    frame: FrameId,
    size: usize,
}

/// Registration map plus the LIFO size stack
#[derive(Debug, Default)]
pub struct SizeChannel {
    registrations: HashMap<StructId, Registration>,
    stack: Vec<SizeStackRecord>,
}

impl SizeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a structure instance for size profiling.
    pub fn register(&mut self, struct_id: StructId, injected: bool, source: SizeSource) {
        self.registrations
            .insert(struct_id, Registration { injected, source });
    }

    /// Register with a snapshotted size value.
    pub fn register_value(&mut self, struct_id: StructId, injected: bool, size: usize) {
        self.register(struct_id, injected, SizeSource::Value(size));
    }

    /// Register with a live size cell.
    pub fn register_shared(&mut self, struct_id: StructId, injected: bool, cell: Arc<AtomicUsize>) {
        self.register(struct_id, injected, SizeSource::Shared(cell));
    }

    /// Remove a registration; unknown ids are a no-op.
    pub fn unregister(&mut self, struct_id: StructId) {
        self.registrations.remove(&struct_id);
    }

    /// Push a size record for the frame the upcoming exit will look up.
    /// `current` is the marking call's own token, `caller` the one a level
    /// up; the registration's mode picks between them.
    pub fn using(&mut self, struct_id: StructId, current: FrameId, caller: FrameId) {
        if let Some(registration) = self.registrations.get(&struct_id) {
            let frame = if registration.injected { caller } else { current };
            let size = registration.source.current();
            self.stack.push(SizeStackRecord { frame, size });
        }
    }

    /// Like `using`, but carries the size explicitly, refreshing a `Value`
    /// source's snapshot along the way.
    pub fn using_value(
        &mut self,
        struct_id: StructId,
        current: FrameId,
        caller: FrameId,
        size: usize,
    ) {
        if let Some(registration) = self.registrations.get_mut(&struct_id) {
            if let SizeSource::Value(stored) = &mut registration.source {
                *stored = size;
            }
            let frame = if registration.injected { caller } else { current };
            self.stack.push(SizeStackRecord { frame, size });
        }
    }

    /// Pop and return the top record's size, but only if it belongs to
    /// `frame`; otherwise 0 and the stack is untouched.
    pub fn get_size_record(&mut self, frame: FrameId) -> usize {
        match self.stack.last() {
            Some(top) if top.frame == frame => {
                let size = top.size;
                self.stack.pop();
                size
            }
            _ => 0,
        }
    }

    /// Pop the top record if it belongs to `frame`, discarding the value.
    /// Used when a sampled-but-not-selected exit is dropped, so the record
    /// cannot leak into an unrelated call.
    pub fn remove_size_record(&mut self, frame: FrameId) {
        if matches!(self.stack.last(), Some(top) if top.frame == frame) {
            self.stack.pop();
        }
    }

    /// Sweep stale records after an unwind: deeper frames compare greater,
    /// so everything at or below `frame` is popped.
    pub fn clean_size_records(&mut self, frame: FrameId) {
        while matches!(self.stack.last(), Some(top) if top.frame >= frame) {
            self.stack.pop();
        }
    }

    /// Records currently on the size stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
