//! Instrumentation record model
//!
//! Identities here are opaque by design: a `FunctionId` is whatever
//! address-sized value the instrumentation layer hands us (symbolication is
//! downstream work), and a `FrameId` is a call token that only needs equality
//! and LIFO ordering, not a real frame pointer.

use std::fmt;

/// Stable, process-unique identity of an instrumented function. Rendered in
/// hexadecimal in the trace log since downstream tooling treats it as an
/// entry address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u64);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Opaque call token supplied by the instrumentation layer at each call
/// boundary. Deeper frames compare greater, so a depth counter works as well
/// as a frame address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Identity of a structure instance registered for size profiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructId(pub u64);

/// Which side of a call boundary an event was captured on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Enter,
    Exit,
}

impl Direction {
    /// Single-character trace-log marker: `i` into a function, `o` out of it.
    pub fn glyph(self) -> char {
        match self {
            Direction::Enter => 'i',
            Direction::Exit => 'o',
        }
    }
}

/// One accepted instrumentation event. Owned exclusively by the trace buffer
/// until flushed, then discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub direction: Direction,
    pub function: FunctionId,
    /// Monotonic microseconds.
    pub timestamp_us: u64,
    /// Structure size correlated at exit; 0 when unused.
    pub structure_size: usize,
}

impl TraceRecord {
    /// Record for a function-enter event.
    pub fn enter(function: FunctionId, timestamp_us: u64) -> Self {
        Self {
            direction: Direction::Enter,
            function,
            timestamp_us,
            structure_size: 0,
        }
    }

    /// Record for a function-exit event, carrying the size the side channel
    /// correlated with this call (0 when none).
    pub fn exit(function: FunctionId, timestamp_us: u64, structure_size: usize) -> Self {
        Self {
            direction: Direction::Exit,
            function,
            timestamp_us,
            structure_size,
        }
    }
}

impl fmt::Display for TraceRecord {
    /// Trace-log line rendering. Enter lines carry three fields, exit lines
    /// a fourth for the structure size.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Enter => write!(
                f,
                "{} {} {}",
                self.direction.glyph(),
                self.function,
                self.timestamp_us
            ),
            Direction::Exit => write!(
                f,
                "{} {} {} {}",
                self.direction.glyph(),
                self.function,
                self.timestamp_us,
                self.structure_size
            ),
        }
    }
}
