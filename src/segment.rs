use serde::{Deserialize, Serialize};

/// A timestamped span of speech, in seconds from the start of the source audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub original_text: String,
    pub translated_text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            original_text: text.into(),
            translated_text: String::new(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn with_translation(mut self, translated: impl Into<String>) -> Self {
        self.translated_text = translated.into();
        self
    }
}

/// Ordered source-language segments for one audio file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub language: Option<String>,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Builds a transcript whose segments satisfy `start <= end` and appear in
    /// non-decreasing `start` order.
    pub fn normalized(language: Option<String>, mut segments: Vec<Segment>) -> Self {
        for segment in &mut segments {
            segment.original_text = segment.original_text.trim().to_string();
            if segment.start < 0.0 {
                segment.start = 0.0;
            }
            if segment.end < segment.start {
                segment.end = segment.start;
            }
        }
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self { language, segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// End of the last segment, i.e. the span of source speech covered.
    pub fn speech_end(&self) -> f64 {
        self.segments.iter().map(|s| s.end).fold(0.0, f64::max)
    }

    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.original_text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
