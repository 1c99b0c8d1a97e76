use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::pipeline::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Queued,
    Acquiring,
    ExtractingAudio,
    Transcribing,
    Translating,
    Synthesizing,
    GeneratingSubtitles,
    Muxing,
    Summarizing,
    Delivering,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Acquiring => "ACQUIRING",
            JobStatus::ExtractingAudio => "EXTRACTING_AUDIO",
            JobStatus::Transcribing => "TRANSCRIBING",
            JobStatus::Translating => "TRANSLATING",
            JobStatus::Synthesizing => "SYNTHESIZING",
            JobStatus::GeneratingSubtitles => "GENERATING_SUBTITLES",
            JobStatus::Muxing => "MUXING",
            JobStatus::Summarizing => "SUMMARIZING",
            JobStatus::Delivering => "DELIVERING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Status shown while a pipeline is in `stage`; `Done` has none of its own.
    pub fn from_stage(stage: Stage) -> Option<Self> {
        Some(match stage {
            Stage::Acquiring => JobStatus::Acquiring,
            Stage::ExtractingAudio => JobStatus::ExtractingAudio,
            Stage::Transcribing => JobStatus::Transcribing,
            Stage::Translating => JobStatus::Translating,
            Stage::Synthesizing => JobStatus::Synthesizing,
            Stage::GeneratingSubtitles => JobStatus::GeneratingSubtitles,
            Stage::Muxing => JobStatus::Muxing,
            Stage::Summarizing => JobStatus::Summarizing,
            Stage::Done => return None,
        })
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(JobStatus::Queued),
            "ACQUIRING" => Ok(JobStatus::Acquiring),
            "EXTRACTING_AUDIO" => Ok(JobStatus::ExtractingAudio),
            "TRANSCRIBING" => Ok(JobStatus::Transcribing),
            "TRANSLATING" => Ok(JobStatus::Translating),
            "SYNTHESIZING" => Ok(JobStatus::Synthesizing),
            "GENERATING_SUBTITLES" => Ok(JobStatus::GeneratingSubtitles),
            "MUXING" => Ok(JobStatus::Muxing),
            "SUMMARIZING" => Ok(JobStatus::Summarizing),
            "DELIVERING" => Ok(JobStatus::Delivering),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
