// Speech transcription
//
// - whisper_cli: OpenAI Whisper command-line implementation (JSON output)
//
// The model is loaded by the CLI on every invocation; nothing is cached
// between requests.

pub mod whisper_cli;

use async_trait::async_trait;
use std::path::Path;

use crate::config::TranscriberConfig;
use crate::error::Result;
use crate::segment::Transcript;

pub use whisper_cli::WhisperCliTranscriber;

/// Converts an audio file into ordered, timestamped source-language segments
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript>;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_default(config: TranscriberConfig) -> Box<dyn Transcriber> {
        Box::new(WhisperCliTranscriber::new(config))
    }
}
