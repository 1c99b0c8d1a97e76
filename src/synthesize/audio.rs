use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use crate::error::{DublineError, Result};

/// Length of each block copied by `speed_up`
const SPEEDUP_CHUNK_MS: u32 = 50;
/// Overlap between consecutive blocks
const SPEEDUP_CROSSFADE_MS: u32 = 10;

/// Mono PCM audio, samples in [-1.0, 1.0]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    sample_rate: u32,
    samples: Vec<f32>,
}

impl AudioClip {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self { sample_rate, samples }
    }

    pub fn empty(sample_rate: u32) -> Self {
        Self::new(sample_rate, Vec::new())
    }

    pub fn silence(sample_rate: u32, duration: Duration) -> Self {
        Self::new(sample_rate, vec![0.0; samples_for(sample_rate, duration)])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    pub fn append(&mut self, other: &AudioClip) -> Result<()> {
        if other.sample_rate != self.sample_rate {
            return Err(DublineError::synthesis(format!(
                "sample rate mismatch: track is {} Hz, clip is {} Hz",
                self.sample_rate, other.sample_rate
            )));
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    pub fn append_silence(&mut self, duration: Duration) {
        let count = samples_for(self.sample_rate, duration);
        self.samples.resize(self.samples.len() + count, 0.0);
    }

    /// Decode a WAV file (any integer or float format), downmixing to mono.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| DublineError::synthesis(format!("invalid WAV data: {}", e)))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| DublineError::synthesis(format!("invalid WAV samples: {}", e)))?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| DublineError::synthesis(format!("invalid WAV samples: {}", e)))?
            }
        };

        let channels = spec.channels.max(1) as usize;
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        Ok(Self::new(spec.sample_rate, samples))
    }

    /// Encode as 16-bit mono PCM WAV.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| DublineError::synthesis(format!("failed to start WAV: {}", e)))?;
            for sample in &self.samples {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer
                    .write_sample(value)
                    .map_err(|e| DublineError::synthesis(format!("failed to write WAV: {}", e)))?;
            }
            writer
                .finalize()
                .map_err(|e| DublineError::synthesis(format!("failed to finalize WAV: {}", e)))?;
        }
        Ok(cursor.into_inner())
    }

    pub async fn write_wav<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_wav_bytes()?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

pub fn silence(sample_rate: u32, duration: Duration) -> AudioClip {
    AudioClip::silence(sample_rate, duration)
}

fn samples_for(sample_rate: u32, duration: Duration) -> usize {
    (sample_rate as u128 * duration.as_millis() / 1000) as usize
}

/// Shorten a clip by `speed` without shifting pitch.
///
/// Fixed-size blocks are taken from the input at `speed` times the output
/// rate and overlap-added with a linear crossfade. The result always holds
/// `round(len / speed)` samples. Factors at or below 1.0 return the clip
/// unchanged; configuration rejects them before a run starts.
pub fn speed_up(clip: &AudioClip, speed: f32) -> AudioClip {
    if speed <= 1.0 || clip.is_empty() {
        return clip.clone();
    }

    let input = clip.samples();
    let target_len = (input.len() as f64 / speed as f64).round() as usize;

    let chunk = ((clip.sample_rate * SPEEDUP_CHUNK_MS / 1000) as usize).max(2);
    let fade = ((clip.sample_rate * SPEEDUP_CROSSFADE_MS / 1000) as usize).min(chunk / 2);
    let hop_out = chunk - fade;
    let hop_in = hop_out as f64 * speed as f64;

    let mut output: Vec<f32> = Vec::with_capacity(target_len + chunk);
    let mut block = 0usize;
    while output.len() < target_len {
        let in_start = (block as f64 * hop_in).round() as usize;
        if in_start >= input.len() {
            break;
        }
        let piece = &input[in_start..(in_start + chunk).min(input.len())];
        let out_start = block * hop_out;

        for (i, &sample) in piece.iter().enumerate() {
            let idx = out_start + i;
            if idx < output.len() {
                // crossfade region
                let w = (i + 1) as f32 / (fade + 1) as f32;
                output[idx] = output[idx] * (1.0 - w) + sample * w;
            } else {
                output.push(sample);
            }
        }
        block += 1;
    }

    output.resize(target_len, 0.0);
    AudioClip::new(clip.sample_rate, output)
}
