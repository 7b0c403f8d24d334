//! Audio plumbing shared by meeting capture, voice input and spoken replies.
//!
//! Everything here works on mono `f32` samples in `[-1.0, 1.0]`.

pub mod capture;
pub mod playback;

use std::io::Cursor;
use std::path::Path;

use crate::error::{AssistantError, Result};

/// Mono audio at a known rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Pcm {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Average interleaved channels down to mono.
pub fn to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    let ch = usize::from(channels);
    data.chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Streaming linear-interpolation resampler.
///
/// Input may arrive in chunks of any size; the read position and the last
/// sample carry over between calls, so chunked output matches resampling
/// the concatenated input in one go.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    /// Source samples advanced per output sample.
    step: f64,
    /// Read position relative to the start of the next chunk. `-1.0..0.0`
    /// interpolates between `last` and the chunk's first sample.
    pos: f64,
    last: Option<f32>,
}

impl LinearResampler {
    pub fn new(src_rate: u32, dst_rate: u32) -> Self {
        let step = if src_rate == 0 || dst_rate == 0 {
            1.0
        } else {
            f64::from(src_rate) / f64::from(dst_rate)
        };
        Self {
            step,
            pos: 0.0,
            last: None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.step == 1.0
    }

    /// Resample one chunk, appending to `out`.
    pub fn process(&mut self, input: &[f32], out: &mut Vec<f32>) {
        if self.is_passthrough() {
            out.extend_from_slice(input);
            return;
        }
        let Some(&tail) = input.last() else {
            return;
        };
        let len = input.len() as i64;
        loop {
            let floor = self.pos.floor();
            let idx = floor as i64;
            if idx + 1 >= len {
                break;
            }
            let frac = (self.pos - floor) as f32;
            let a = if idx < 0 {
                self.last.unwrap_or(input[0])
            } else {
                input[idx as usize]
            };
            let b = input[(idx + 1) as usize];
            out.push(a + (b - a) * frac);
            self.pos += self.step;
        }
        self.pos -= len as f64;
        self.last = Some(tail);
    }

    /// Resample a whole buffer with a fresh resampler.
    pub fn resample(input: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
        let mut resampler = Self::new(src_rate, dst_rate);
        let mut out = Vec::with_capacity(
            (input.len() as f64 / resampler.step).ceil() as usize + 1,
        );
        resampler.process(input, &mut out);
        out
    }
}

/// Write mono samples as a 16-bit PCM WAV.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let format = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let wav_err = |e: hound::Error| AssistantError::Audio(format!("cannot write WAV: {e}"));
    let mut writer = hound::WavWriter::create(path, format).map_err(wav_err)?;
    for &s in samples {
        let sample = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(sample).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)
}

/// Decode an in-memory WAV file to mono.
///
/// # Errors
///
/// Returns an error if the bytes are not a readable WAV file.
pub fn decode_wav(bytes: &[u8]) -> Result<Pcm> {
    let wav_err = |e: hound::Error| AssistantError::Audio(format!("cannot read WAV: {e}"));
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(wav_err)?;
    let format = reader.spec();
    let interleaved: Vec<f32> = match format.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(wav_err)?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (format.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(wav_err)?
        }
    };
    Ok(Pcm {
        samples: to_mono(&interleaved, format.channels),
        sample_rate: format.sample_rate,
    })
}
