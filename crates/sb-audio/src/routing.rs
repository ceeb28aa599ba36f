//! Per-track output routing table
//!
//! Maps (instrument id, component id) to a stereo track output index.
//! The table is immutable once built; topology rebuilds publish a fresh
//! `Arc<TrackRouting>` so the real-time cycle observes either the fully
//! old or fully new mapping, never a partial one.

use std::collections::HashMap;

use crate::PortId;

/// Upper bound on stereo track output pairs. Buffers for all of them
/// are preallocated at init so a topology rebuild never allocates on
/// the real-time path.
pub const MAX_TRACK_OUTPUTS: usize = 64;

/// Stereo channel of a track output port pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    fn suffix(self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::Right => "R",
        }
    }
}

/// Port name for track output `track` of an instrument component:
/// `Track_<componentName>_<trackIndex+1>_<instrumentName>_<L|R>`.
pub fn track_port_name(component: &str, track: usize, instrument: &str, channel: Channel) -> String {
    format!(
        "Track_{}_{}_{}_{}",
        component,
        track + 1,
        instrument,
        channel.suffix()
    )
}

/// Server-side handles of one registered stereo pair, with the names it
/// currently carries.
#[derive(Debug, Clone)]
pub(crate) struct TrackPorts {
    pub l: PortId,
    pub r: PortId,
    pub name_l: String,
    pub name_r: String,
}

/// Immutable (instrument, component) → track index assignment.
#[derive(Debug, Clone, Default)]
pub struct TrackRouting {
    assignments: HashMap<(u32, u32), usize>,
    track_count: usize,
}

impl TrackRouting {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, instrument_id: u32, component_id: u32, track: usize) {
        self.assignments.insert((instrument_id, component_id), track);
        self.track_count = self.track_count.max(track + 1);
    }

    /// Track output index assigned to an instrument component.
    pub fn track_for(&self, instrument_id: u32, component_id: u32) -> Option<usize> {
        self.assignments.get(&(instrument_id, component_id)).copied()
    }

    /// Number of stereo track output pairs in use.
    pub fn track_count(&self) -> usize {
        self.track_count
    }
}
