//! Disk writer driver
//!
//! The offline counterpart of the live driver: same capability
//! contract, but the caller owns the loop. Every `run_cycle` zeroes the
//! cycle buffers, lets the processor fill them at the current transport
//! position, converts to the configured bit depth, and appends to the
//! WAV stream. Nothing here depends on wall-clock time or scheduling,
//! which is what makes repeated renders byte-identical.

use std::fs::File;
use std::io::BufWriter;

use thiserror::Error;

use sb_audio::{AudioError, AudioOutput, AudioProcessor, AudioResult};
use sb_core::{Sample, TransportInfo};

use crate::{RenderConfig, SampleFormat};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("WAV stream error: {0}")]
    Wav(#[from] hound::Error),

    #[error("render target not open")]
    NotConnected,
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Offline render driver writing the produced cycles to a WAV file.
pub struct DiskWriterDriver {
    config: RenderConfig,
    transport: TransportInfo,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    out_l: Vec<Sample>,
    out_r: Vec<Sample>,
    frames_written: u64,
}

impl DiskWriterDriver {
    pub fn new(config: RenderConfig) -> Self {
        let transport = TransportInfo::new(config.bpm, config.sample_rate);
        Self {
            config,
            transport,
            writer: None,
            out_l: Vec::new(),
            out_r: Vec::new(),
            frames_written: 0,
        }
    }

    /// Total frames appended to the stream so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Run exactly one cycle of the production path and append the
    /// result to the stream. Returns the number of frames written.
    pub fn run_cycle(&mut self, processor: &mut dyn AudioProcessor) -> RenderResult<u32> {
        if self.writer.is_none() {
            return Err(RenderError::NotConnected);
        }

        let frames = self.config.buffer_size as usize;
        self.out_l[..frames].fill(0.0);
        self.out_r[..frames].fill(0.0);

        let Self {
            transport,
            out_l,
            out_r,
            ..
        } = self;
        processor.process(transport, &mut out_l[..frames], &mut out_r[..frames], &mut []);

        self.append(frames)?;
        self.transport.advance(self.config.buffer_size);
        self.frames_written += frames as u64;
        Ok(frames as u32)
    }

    /// Finish the stream and write the final header.
    pub fn finalize(&mut self) -> RenderResult<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }

    fn append(&mut self, frames: usize) -> RenderResult<()> {
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => return Err(RenderError::NotConnected),
        };

        match self.config.format {
            SampleFormat::Float32 => {
                for i in 0..frames {
                    writer.write_sample(self.out_l[i].clamp(-1.0, 1.0))?;
                    writer.write_sample(self.out_r[i].clamp(-1.0, 1.0))?;
                }
            }
            SampleFormat::Int8 => {
                for i in 0..frames {
                    writer.write_sample(scale_to(self.out_l[i], i8::MAX as f64) as i8)?;
                    writer.write_sample(scale_to(self.out_r[i], i8::MAX as f64) as i8)?;
                }
            }
            SampleFormat::Int16 => {
                for i in 0..frames {
                    writer.write_sample(scale_to(self.out_l[i], i16::MAX as f64) as i16)?;
                    writer.write_sample(scale_to(self.out_r[i], i16::MAX as f64) as i16)?;
                }
            }
            SampleFormat::Int24 => {
                for i in 0..frames {
                    writer.write_sample(scale_to(self.out_l[i], 8_388_607.0) as i32)?;
                    writer.write_sample(scale_to(self.out_r[i], 8_388_607.0) as i32)?;
                }
            }
            SampleFormat::Int32 => {
                for i in 0..frames {
                    writer.write_sample(scale_to(self.out_l[i], i32::MAX as f64) as i32)?;
                    writer.write_sample(scale_to(self.out_r[i], i32::MAX as f64) as i32)?;
                }
            }
        }
        Ok(())
    }
}

#[inline]
fn scale_to(sample: Sample, full_scale: f64) -> i64 {
    (sample.clamp(-1.0, 1.0) as f64 * full_scale).round() as i64
}

impl AudioOutput for DiskWriterDriver {
    fn init(&mut self, buffer_size: u32) -> AudioResult<()> {
        if buffer_size > 0 {
            self.config.buffer_size = buffer_size;
        }
        let frames = self.config.buffer_size as usize;
        self.out_l = vec![0.0; frames];
        self.out_r = vec![0.0; frames];
        self.transport = TransportInfo::new(self.config.bpm, self.config.sample_rate);
        self.frames_written = 0;
        Ok(())
    }

    fn connect(&mut self) -> AudioResult<()> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: self.config.sample_rate,
            bits_per_sample: self.config.format.bits(),
            sample_format: if self.config.format.is_float() {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };
        let writer = hound::WavWriter::create(&self.config.path, spec)
            .map_err(|e| AudioError::Render(e.to_string()))?;
        self.writer = Some(writer);
        // the offline transport always progresses
        self.transport.playing = true;

        log::info!(
            "disk writer opened: {} ({} Hz, {} bit)",
            self.config.path.display(),
            self.config.sample_rate,
            self.config.format.bits()
        );
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Err(err) = self.finalize() {
            log::warn!("failed to finalize render target: {err}");
        }
        self.transport.playing = false;
    }

    fn buffer_size(&self) -> u32 {
        self.config.buffer_size
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
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

impl Drop for DiskWriterDriver {
    fn drop(&mut self) {
        if let Err(err) = self.finalize() {
            log::warn!("failed to finalize render target: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use sb_audio::TrackBuffers;

    use super::*;

    /// Deterministic ramp derived purely from the transport position.
    struct RampProcessor;

    impl AudioProcessor for RampProcessor {
        fn process(
            &mut self,
            transport: &TransportInfo,
            out_l: &mut [Sample],
            out_r: &mut [Sample],
            _tracks: &mut [TrackBuffers],
        ) {
            for (i, sample) in out_l.iter_mut().enumerate() {
                *sample = ((transport.frame + i as u64) % 97) as Sample / 97.0;
            }
            for (i, sample) in out_r.iter_mut().enumerate() {
                *sample = -(((transport.frame + i as u64) % 89) as Sample) / 89.0;
            }
        }
    }

    fn render(path: &std::path::Path, format: SampleFormat, cycles: usize) -> u64 {
        let config = RenderConfig::new(path)
            .with_sample_rate(48000)
            .with_format(format)
            .with_buffer_size(512);
        let mut driver = DiskWriterDriver::new(config);
        driver.init(0).unwrap();
        driver.connect().unwrap();

        let mut processor = RampProcessor;
        for _ in 0..cycles {
            driver.run_cycle(&mut processor).unwrap();
        }
        let written = driver.frames_written();
        driver.disconnect();
        written
    }

    #[test]
    fn test_render_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a.wav");
        let path_b = dir.path().join("b.wav");

        render(&path_a, SampleFormat::Int16, 20);
        render(&path_b, SampleFormat::Int16, 20);

        let bytes_a = std::fs::read(&path_a).unwrap();
        let bytes_b = std::fs::read(&path_b).unwrap();
        assert!(!bytes_a.is_empty());
        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn test_written_file_matches_config() {
        let dir = tempfile::tempdir().unwrap();

        for format in [
            SampleFormat::Int8,
            SampleFormat::Int16,
            SampleFormat::Int24,
            SampleFormat::Int32,
            SampleFormat::Float32,
        ] {
            let path = dir.path().join(format!("{format:?}.wav"));
            let written = render(&path, format, 4);
            assert_eq!(written, 4 * 512);

            let reader = hound::WavReader::open(&path).unwrap();
            let spec = reader.spec();
            assert_eq!(spec.channels, 2);
            assert_eq!(spec.sample_rate, 48000);
            assert_eq!(spec.bits_per_sample, format.bits());
            assert_eq!(reader.duration(), 4 * 512);
        }
    }

    #[test]
    fn test_transport_advances_per_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig::new(dir.path().join("t.wav")).with_buffer_size(256);
        let mut driver = DiskWriterDriver::new(config);
        driver.init(0).unwrap();
        driver.connect().unwrap();

        let mut processor = RampProcessor;
        for _ in 0..3 {
            driver.run_cycle(&mut processor).unwrap();
        }
        assert_eq!(driver.transport().frame, 768);
        assert!(driver.transport().playing);
        assert!(
            (driver.transport().frame as f64
                - driver.transport().tick * driver.transport().tick_size)
                .abs()
                < 1e-6
        );
    }

    #[test]
    fn test_run_cycle_requires_connect() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig::new(dir.path().join("x.wav"));
        let mut driver = DiskWriterDriver::new(config);
        driver.init(0).unwrap();

        let mut processor = RampProcessor;
        assert!(matches!(
            driver.run_cycle(&mut processor),
            Err(RenderError::NotConnected)
        ));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig::new(dir.path().join("d.wav"));
        let mut driver = DiskWriterDriver::new(config);
        driver.init(0).unwrap();
        driver.connect().unwrap();
        driver.disconnect();
        driver.disconnect();
        assert!(hound::WavReader::open(dir.path().join("d.wav")).is_ok());
    }
}
