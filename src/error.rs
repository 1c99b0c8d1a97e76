use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DublineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to acquire {url}: {message}")]
    Acquisition {
        url: String,
        message: String,
        transient: bool,
    },

    #[error("Audio extraction error: {0}")]
    Extraction(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Translation error (segment {}): {message}", segment_label(.segment))]
    Translation {
        segment: Option<usize>,
        message: String,
        transient: bool,
    },

    #[error("Speech synthesis error (segment {}): {message}", segment_label(.segment))]
    Synthesis {
        segment: Option<usize>,
        message: String,
    },

    #[error("Subtitle generation error: {0}")]
    Subtitle(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Summarization error: {0}")]
    Summarization(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Job queue error: {0}")]
    Queue(String),

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },
}

fn segment_label(segment: &Option<usize>) -> String {
    segment.map_or_else(|| "-".to_string(), |s| s.to_string())
}

/// Stable, serializable tag for each failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Acquisition,
    Extraction,
    Transcription,
    Translation,
    Synthesis,
    Subtitle,
    Mux,
    Database,
    Delivery,
    Summarization,
    Validation,
    Config,
    Io,
    Queue,
    Pipeline,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Acquisition => "acquisition",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Transcription => "transcription",
            ErrorKind::Translation => "translation",
            ErrorKind::Synthesis => "synthesis",
            ErrorKind::Subtitle => "subtitle",
            ErrorKind::Mux => "mux",
            ErrorKind::Database => "database",
            ErrorKind::Delivery => "delivery",
            ErrorKind::Summarization => "summarization",
            ErrorKind::Validation => "validation",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Queue => "queue",
            ErrorKind::Pipeline => "pipeline",
        }
    }
}

impl DublineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DublineError::Io(_) => ErrorKind::Io,
            DublineError::Http(_) | DublineError::Timeout { .. } => ErrorKind::Pipeline,
            DublineError::Config(_) => ErrorKind::Config,
            DublineError::Acquisition { .. } => ErrorKind::Acquisition,
            DublineError::Extraction(_) => ErrorKind::Extraction,
            DublineError::Transcription(_) => ErrorKind::Transcription,
            DublineError::Translation { .. } => ErrorKind::Translation,
            DublineError::Synthesis { .. } => ErrorKind::Synthesis,
            DublineError::Subtitle(_) => ErrorKind::Subtitle,
            DublineError::Media(_) => ErrorKind::Mux,
            DublineError::Database(_) => ErrorKind::Database,
            DublineError::Delivery(_) => ErrorKind::Delivery,
            DublineError::Summarization(_) => ErrorKind::Summarization,
            DublineError::Validation(_) => ErrorKind::Validation,
            DublineError::Queue(_) => ErrorKind::Queue,
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DublineError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            DublineError::Timeout { .. } => true,
            DublineError::Acquisition { transient, .. } => *transient,
            DublineError::Translation { transient, .. } => *transient,
            _ => false,
        }
    }

    pub fn translation(message: impl Into<String>) -> Self {
        DublineError::Translation {
            segment: None,
            message: message.into(),
            transient: false,
        }
    }

    /// A translation failure caused by the backend being unreachable or overloaded.
    pub fn translation_unavailable(message: impl Into<String>) -> Self {
        DublineError::Translation {
            segment: None,
            message: message.into(),
            transient: true,
        }
    }

    pub fn synthesis(message: impl Into<String>) -> Self {
        DublineError::Synthesis {
            segment: None,
            message: message.into(),
        }
    }

    /// Attach a 1-based segment index to a per-segment failure.
    pub fn at_segment(self, index: usize) -> Self {
        match self {
            DublineError::Translation {
                message, transient, ..
            } => DublineError::Translation {
                segment: Some(index),
                message,
                transient,
            },
            DublineError::Synthesis { message, .. } => DublineError::Synthesis {
                segment: Some(index),
                message,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, DublineError>;
