//! Transport data model
//!
//! `TransportInfo` is the internally maintained musical transport: frame
//! position, fractional tick position, tempo, and the derived tick size.
//! It is created once per driver instance and mutated every cycle from
//! the real-time thread only.

use crate::time::tick_size_for;

/// Minimum accepted tempo
pub const MIN_TEMPO: f64 = 30.0;

/// Maximum accepted tempo
pub const MAX_TEMPO: f64 = 500.0;

/// Current musical/frame position and tempo of the transport.
///
/// Invariant: `tick_size` is always consistent with `bpm` and the sample
/// rate it was last computed against, and `frame` and `tick` describe the
/// same position (`frame ≈ tick * tick_size`) except during the bounded
/// reconciliation window right after a relocation or tempo change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportInfo {
    /// Frame position, monotonic while rolling
    pub frame: u64,
    /// Fractional musical position in ticks
    pub tick: f64,
    /// Tempo in beats per minute
    pub bpm: f64,
    /// Frames per tick, derived from tempo and sample rate
    pub tick_size: f64,
    /// Whether the transport is progressing
    pub playing: bool,
}

impl TransportInfo {
    pub fn new(bpm: f64, sample_rate: u32) -> Self {
        let bpm = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        Self {
            frame: 0,
            tick: 0.0,
            bpm,
            tick_size: tick_size_for(bpm, sample_rate),
            playing: false,
        }
    }

    /// Change tempo and recompute the tick size.
    ///
    /// Out-of-range tempos are clamped. Positions are left untouched;
    /// the caller owns the frame/tick reconciliation that a tick-size
    /// change requires.
    pub fn set_bpm(&mut self, bpm: f64, sample_rate: u32) {
        let bpm = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        self.bpm = bpm;
        self.tick_size = tick_size_for(bpm, sample_rate);
    }

    /// Advance both clocks by one cycle worth of frames.
    #[inline]
    pub fn advance(&mut self, frames: u32) {
        self.frame += frames as u64;
        self.tick += frames as f64 / self.tick_size;
    }

    /// Jump to a frame position, deriving the tick position from it.
    pub fn locate_frame(&mut self, frame: u64) {
        self.frame = frame;
        self.tick = frame as f64 / self.tick_size;
    }

    /// Jump to a tick position, deriving the frame position from it.
    pub fn locate_tick(&mut self, tick: f64) {
        self.tick = tick.max(0.0);
        self.frame = self.frame_for_tick(self.tick);
    }

    /// Frame equivalent of a tick position under the current tick size.
    #[inline]
    pub fn frame_for_tick(&self, tick: f64) -> u64 {
        (tick * self.tick_size).round().max(0.0) as u64
    }
}
