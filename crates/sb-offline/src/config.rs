//! Offline render configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Sample encoding of the rendered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SampleFormat {
    Int8,
    #[default]
    Int16,
    Int24,
    Int32,
    Float32,
}

impl SampleFormat {
    pub fn bits(self) -> u16 {
        match self {
            Self::Int8 => 8,
            Self::Int16 => 16,
            Self::Int24 => 24,
            Self::Int32 | Self::Float32 => 32,
        }
    }

    pub fn is_float(self) -> bool {
        self == Self::Float32
    }
}

/// Configuration of one offline render. Channel count is fixed at 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output file path
    pub path: PathBuf,
    /// Sample rate of the rendered file
    pub sample_rate: u32,
    /// Sample encoding
    pub format: SampleFormat,
    /// Frames per render cycle
    pub buffer_size: u32,
    /// Initial tempo of the internal transport
    pub bpm: f64,
}

impl RenderConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sample_rate: 44100,
            format: SampleFormat::default(),
            buffer_size: 1024,
            bpm: 120.0,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_format(mut self, format: SampleFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: u32) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}
