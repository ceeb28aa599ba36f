//! sb-audio: Real-time audio output abstraction
//!
//! Every way StrikeBox can emit audio implements the same capability
//! trait, so the engine never branches on which output is present:
//!
//! ```text
//! ┌───────────────┐      ┌──────────────────┐      ┌──────────────┐
//! │ AudioProcessor│─────▶│   AudioOutput    │─────▶│ AudioServer  │
//! │ (sequencer/   │      │ ServerDriver     │      │ (external    │
//! │  mixer seam)  │      │ NullDriver       │      │  transport   │
//! │               │      │ DiskWriterDriver │      │  server)     │
//! └───────────────┘      └──────────────────┘      └──────────────┘
//! ```
//!
//! The `ServerDriver` is the hard part: each real-time cycle it
//! reconciles the internally maintained musical transport with the
//! externally owned server transport, arbitrates the timebase master
//! role, and routes per-track output through registered port pairs.
//! Failures on any path fall back to the always-available `NullDriver`
//! rather than terminating the process.

mod driver;
mod error;
mod null_driver;
mod output;
mod routing;
mod server;
mod trampoline;

pub use driver::*;
pub use error::*;
pub use null_driver::*;
pub use output::*;
pub use routing::*;
pub use server::*;
pub use trampoline::*;

#[cfg(test)]
pub(crate) mod fake;
