//! Circtrace - configuration-driven instrumentation trace collector
//!
//! This library is the runtime half of a function-level tracer: an
//! instrumented program reports every function enter and exit, a policy
//! table loaded from a small typed configuration language decides per event
//! whether to record it (runtime filtering and every-Nth-call sampling),
//! accepted records are buffered with graceful degradation to direct writes,
//! and a side channel correlates exits with structure-size values.

pub mod buffer;
pub mod clock;
pub mod collector;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod record;
pub mod size_channel;
pub mod trace_log;
