//! Musical time units
//!
//! Two clocks run through the audio core:
//! - Frames: one sample-clock tick, the server's native position unit
//! - Ticks: the musical position unit; frames-per-tick ("tick size")
//!   depends on tempo and sample rate
//!
//! Bar/beat/tick (BBT) is the position representation broadcast by a
//! timebase master on the shared transport.

use serde::{Deserialize, Serialize};

/// Sequencer resolution in ticks per quarter note.
pub const TICKS_PER_QUARTER: u32 = 48;

/// Frames per tick for a given tempo and sample rate.
#[inline]
pub fn tick_size_for(bpm: f64, sample_rate: u32) -> f64 {
    sample_rate as f64 * 60.0 / (bpm * TICKS_PER_QUARTER as f64)
}

/// Bar/beat/tick transport position, as attached to a server transport
/// query by the current timebase master.
///
/// Bars and beats are 1-based, matching the convention of the transport
/// protocol this mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BbtPosition {
    /// Current bar (1-based)
    pub bar: i32,
    /// Current beat within the bar (1-based)
    pub beat: i32,
    /// Current tick within the beat
    pub tick: i32,
    /// Absolute tick at the start of the current bar
    pub bar_start_tick: f64,
    /// Beats per bar (time signature numerator)
    pub beats_per_bar: f32,
    /// Note value of one beat (time signature denominator)
    pub beat_type: f32,
    /// Ticks per beat used by this position
    pub ticks_per_beat: f64,
    /// Tempo in beats per minute
    pub bpm: f64,
}

impl BbtPosition {
    /// Build a BBT position from an absolute tick position, assuming a
    /// 4/4 meter and the native sequencer resolution.
    pub fn from_tick(abs_tick: f64, bpm: f64) -> Self {
        let ticks_per_beat = TICKS_PER_QUARTER as f64;
        let beats_per_bar = 4.0_f64;

        let abs_beat = abs_tick / ticks_per_beat;
        let bar = (abs_beat / beats_per_bar).floor();
        let beat = (abs_beat - bar * beats_per_bar).floor();
        let bar_start_tick = bar * beats_per_bar * ticks_per_beat;

        Self {
            bar: bar as i32 + 1,
            beat: beat as i32 + 1,
            tick: (abs_tick - bar_start_tick - beat * ticks_per_beat) as i32,
            bar_start_tick,
            beats_per_bar: beats_per_bar as f32,
            beat_type: 4.0,
            ticks_per_beat,
            bpm,
        }
    }

    /// Absolute tick position encoded by this BBT triple, in the
    /// position's own resolution.
    pub fn abs_tick(&self) -> f64 {
        self.bar_start_tick
            + (self.beat - 1) as f64 * self.ticks_per_beat
            + self.tick as f64
    }

    /// Absolute tick position rescaled to the native sequencer
    /// resolution (`TICKS_PER_QUARTER`).
    ///
    /// An external master is free to broadcast positions at any
    /// resolution; all internal bookkeeping runs at ours.
    pub fn abs_tick_native(&self) -> f64 {
        if self.ticks_per_beat <= 0.0 {
            return 0.0;
        }
        self.abs_tick() * TICKS_PER_QUARTER as f64 / self.ticks_per_beat
    }
}
