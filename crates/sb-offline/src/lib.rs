//! sb-offline: Offline render driver
//!
//! Implements the same `AudioOutput` contract as the live drivers, but
//! is driven synchronously by a caller-controlled loop instead of a
//! server callback: each `run_cycle` runs exactly one cycle of the
//! production path against fixed-size buffers and appends the produced
//! samples to a WAV stream. Rendering the same musical input twice
//! produces byte-identical files.

mod config;
mod driver;

pub use config::*;
pub use driver::*;
