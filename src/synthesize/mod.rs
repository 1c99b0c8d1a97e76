// Speech synthesis
//
// - backend: HTTP text-to-speech service
// - voice: speaker table and voice descriptors
// - audio: PCM buffer, speed-up, silence and WAV encoding

pub mod audio;
pub mod backend;
pub mod voice;

use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SynthesisConfig;
use crate::error::Result;
use crate::segment::Segment;

pub use audio::{speed_up, AudioClip};
pub use backend::{HttpSpeechBackend, SpeechBackend};
pub use voice::{normalize_language, VoiceProfile};

/// Rate used when every segment is blank and no clip fixes the track rate
const FALLBACK_SAMPLE_RATE: u32 = 44_100;

/// Builds one continuous dubbed track from translated segments
pub struct Synthesizer {
    backend: Arc<dyn SpeechBackend>,
    speed: f32,
    gap: Duration,
}

impl Synthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>, speed: f32, gap: Duration) -> Self {
        Self { backend, speed, gap }
    }

    pub fn from_config(config: &SynthesisConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpSpeechBackend::new(config)?),
            config.speed,
            Duration::from_millis(config.gap_ms),
        ))
    }

    pub fn backend(&self) -> &Arc<dyn SpeechBackend> {
        &self.backend
    }

    /// Synthesize each segment independently, speed it up and append it to
    /// the track followed by the configured gap.
    ///
    /// Segment audio is not fitted to the original `[start, end]` window, so
    /// the track may run longer or shorter than the source speech. Any failed
    /// segment aborts the whole track.
    pub async fn synthesize(
        &self,
        segments: &[Segment],
        voice: &VoiceProfile,
        progress: Option<&ProgressBar>,
    ) -> Result<AudioClip> {
        info!(
            "Synthesizing {} segments with voice: {}",
            segments.len(),
            voice.description
        );

        let mut clips: Vec<Option<AudioClip>> = Vec::with_capacity(segments.len());
        for (idx, segment) in segments.iter().enumerate() {
            let text = segment.translated_text.trim();
            if text.is_empty() {
                debug!("Segment {} is blank, inserting gap only", idx + 1);
                clips.push(None);
            } else {
                let clip = self
                    .backend
                    .speak(text, voice)
                    .await
                    .map_err(|e| e.at_segment(idx + 1))?;
                let clip = speed_up(&clip, self.speed);
                debug!(
                    "Segment {}: {:.2}s of speech after {}x speed-up",
                    idx + 1,
                    clip.duration().as_secs_f64(),
                    self.speed
                );
                clips.push(Some(clip));
            }

            if let Some(bar) = progress {
                bar.inc(1);
            }
        }

        let sample_rate = clips
            .iter()
            .flatten()
            .map(AudioClip::sample_rate)
            .next()
            .unwrap_or(FALLBACK_SAMPLE_RATE);

        let mut track = AudioClip::empty(sample_rate);
        for (idx, clip) in clips.iter().enumerate() {
            if let Some(clip) = clip {
                track.append(clip).map_err(|e| e.at_segment(idx + 1))?;
            }
            track.append_silence(self.gap);
        }

        let speech_end = segments.last().map(|s| s.end).unwrap_or(0.0);
        info!(
            "Dubbed track is {:.2}s; source speech ends at {:.2}s (drift {:+.2}s)",
            track.duration().as_secs_f64(),
            speech_end,
            track.duration().as_secs_f64() - speech_end
        );

        Ok(track)
    }
}
