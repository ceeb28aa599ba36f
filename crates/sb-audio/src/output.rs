//! Output capability contract
//!
//! `AudioOutput` is the uniform interface every driver variant
//! implements; `AudioProcessor` is the seam to the sequencer/mixing
//! engine that fills the cycle buffers. Buffers handed out by a driver
//! are valid only until the next cycle boundary.

use sb_core::{Sample, TransportInfo};

use crate::AudioResult;

/// One stereo pair of per-track cycle buffers.
#[derive(Debug)]
pub struct TrackBuffers {
    pub l: Vec<Sample>,
    pub r: Vec<Sample>,
}

impl TrackBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            l: vec![0.0; capacity],
            r: vec![0.0; capacity],
        }
    }

    /// Zero the first `frames` samples of both channels.
    #[inline]
    pub fn clear(&mut self, frames: usize) {
        let frames = frames.min(self.l.len());
        self.l[..frames].fill(0.0);
        self.r[..frames].fill(0.0);
    }

    /// Mutable stereo view over the first `frames` samples.
    #[inline]
    pub fn stereo(&mut self, frames: usize) -> (&mut [Sample], &mut [Sample]) {
        let frames = frames.min(self.l.len());
        (&mut self.l[..frames], &mut self.r[..frames])
    }

    pub fn capacity(&self) -> usize {
        self.l.len()
    }
}

/// The sequencer/mixing engine seam.
///
/// Called once per cycle from the driver, on the real-time thread:
/// implementations must not block, allocate, or log. All buffers are
/// pre-zeroed; `tracks` holds one stereo pair per routed track output
/// (empty for drivers without per-track routing).
pub trait AudioProcessor: Send + 'static {
    fn process(
        &mut self,
        transport: &TransportInfo,
        out_l: &mut [Sample],
        out_r: &mut [Sample],
        tracks: &mut [TrackBuffers],
    );

    /// Negotiated sample rate changed (non-real-time notification).
    fn set_sample_rate(&mut self, _sample_rate: u32) {}
}

/// Processor producing silence. Default wiring and test stand-in.
pub struct SilenceProcessor;

impl AudioProcessor for SilenceProcessor {
    fn process(
        &mut self,
        _transport: &TransportInfo,
        _out_l: &mut [Sample],
        _out_r: &mut [Sample],
        _tracks: &mut [TrackBuffers],
    ) {
    }
}

/// Capability contract uniform across driver variants.
///
/// `init` must be called once before `connect`; `disconnect` is
/// idempotent and safe even if `connect` never succeeded. The
/// negotiated buffer size and sample rate may be dictated by the
/// external server rather than the caller.
pub trait AudioOutput: Send {
    /// Allocate and negotiate buffers.
    fn init(&mut self, buffer_size: u32) -> AudioResult<()>;

    /// Establish the real output path (server ports or file stream).
    fn connect(&mut self) -> AudioResult<()>;

    /// Tear down the output path. After this returns no real-time
    /// callback will reference driver-owned buffers.
    fn disconnect(&mut self);

    fn buffer_size(&self) -> u32;

    fn sample_rate(&self) -> u32;

    /// Internally maintained transport of this driver.
    fn transport(&self) -> &TransportInfo;

    /// Writable left master-bus buffer for the current cycle.
    fn out_l(&mut self) -> &mut [Sample];

    /// Writable right master-bus buffer for the current cycle.
    fn out_r(&mut self) -> &mut [Sample];

    /// Writable left buffer of track output `track`, if routed.
    fn track_out_l(&mut self, track: usize) -> Option<&mut [Sample]>;

    /// Writable right buffer of track output `track`, if routed.
    fn track_out_r(&mut self, track: usize) -> Option<&mut [Sample]>;
}
