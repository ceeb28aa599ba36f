//! sb-core: Shared types for the StrikeBox audio core
//!
//! This crate provides the foundational types used across all StrikeBox
//! crates: the sample type, musical time (bar/beat/tick), the transport
//! data model, and the instrument topology consumed by the per-track
//! output routing.

mod song;
mod time;
mod transport;

pub use song::*;
pub use time::*;
pub use transport::*;

/// Native sample type of the audio path (server float sample).
pub type Sample = f32;
