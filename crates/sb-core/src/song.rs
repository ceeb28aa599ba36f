//! Instrument topology model
//!
//! The minimal view of a loaded song the audio drivers need: which
//! instruments exist, and which components each of them declares. The
//! per-track port routing is rebuilt from this whenever the topology
//! changes (song load/edit); persistence and editing live elsewhere.

use serde::{Deserialize, Serialize};

/// One playable component of an instrument (e.g. a drumkit layer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentComponent {
    pub id: u32,
    pub name: String,
}

impl InstrumentComponent {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An instrument and its declared components, in stable order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: u32,
    pub name: String,
    pub components: Vec<InstrumentComponent>,
}

impl Instrument {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: InstrumentComponent) -> Self {
        self.components.push(component);
        self
    }
}

/// The currently loaded instrument set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    pub instruments: Vec<Instrument>,
}

impl Song {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruments: Vec::new(),
        }
    }

    pub fn with_instrument(mut self, instrument: Instrument) -> Self {
        self.instruments.push(instrument);
        self
    }

    /// Total number of (instrument, component) pairs, i.e. the number of
    /// stereo track outputs a full routing would need.
    pub fn track_count(&self) -> usize {
        self.instruments.iter().map(|i| i.components.len()).sum()
    }
}
