//! sb-event: Lossy cross-thread driver notification channel
//!
//! Drivers run on a real-time thread that must never block or allocate,
//! yet the rest of the application has to learn about driver-level
//! occurrences (server shutdown, timebase role changes, relocations).
//! This crate provides a fixed-capacity circular buffer of small events:
//! producers on any thread push wait-free, a single non-real-time poller
//! drains in FIFO order, and sustained overflow silently drops the oldest
//! entries. Losing notifications under overload is the accepted design,
//! not a failure mode.

mod event;
mod queue;

pub use event::*;
pub use queue::*;
