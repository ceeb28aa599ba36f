//! Null output driver
//!
//! Always succeeds and produces silence. Every failure path in driver
//! selection falls back to this, so the engine keeps running (and the
//! UI keeps polling) even with no audio backend at all.

use sb_core::{Sample, TransportInfo};

use crate::{AudioOutput, AudioResult};

const NULL_SAMPLE_RATE: u32 = 44100;
const NULL_DEFAULT_BPM: f64 = 120.0;

pub struct NullDriver {
    transport: TransportInfo,
    buffer_size: u32,
    out_l: Vec<Sample>,
    out_r: Vec<Sample>,
}

impl NullDriver {
    pub fn new() -> Self {
        Self {
            transport: TransportInfo::new(NULL_DEFAULT_BPM, NULL_SAMPLE_RATE),
            buffer_size: 0,
            out_l: Vec::new(),
            out_r: Vec::new(),
        }
    }
}

impl Default for NullDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for NullDriver {
    fn init(&mut self, buffer_size: u32) -> AudioResult<()> {
        self.buffer_size = buffer_size;
        self.out_l = vec![0.0; buffer_size as usize];
        self.out_r = vec![0.0; buffer_size as usize];
        Ok(())
    }

    fn connect(&mut self) -> AudioResult<()> {
        log::info!("null driver connected; output is discarded");
        Ok(())
    }

    fn disconnect(&mut self) {}

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    fn sample_rate(&self) -> u32 {
        NULL_SAMPLE_RATE
    }

    fn transport(&self) -> &TransportInfo {
        &self.transport
    }

    fn out_l(&mut self) -> &mut [Sample] {
        &mut self.out_l
    }

    fn out_r(&mut self) -> &mut [Sample] {
        &mut self.out_r
    }

    fn track_out_l(&mut self, _track: usize) -> Option<&mut [Sample]> {
        None
    }

    fn track_out_r(&mut self, _track: usize) -> Option<&mut [Sample]> {
        None
    }
}
