//! Dubline - video localization pipeline
//!
//! Downloads a video, transcribes its speech with whisper, translates each
//! segment, synthesizes a dubbed audio track, writes ASS subtitles and muxes
//! the result with ffmpeg. Runs as a CLI or as an HTTP service with a
//! background job queue.

pub mod acquire;
pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod media;
pub mod notify;
pub mod ollama;
pub mod pipeline;
pub mod retry;
pub mod segment;
pub mod server;
pub mod store;
pub mod subtitle;
pub mod summarize;
pub mod synthesize;
pub mod transcribe;
pub mod translate;
pub mod workspace;
