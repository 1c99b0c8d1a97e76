use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::JobStatus;
use crate::error::ErrorKind;
use crate::workspace::Artifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Dub,
    Summarize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub warnings: Vec<String>,
    pub artifacts: Vec<Artifact>,
    pub translated_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, kind: JobKind) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            status: JobStatus::Queued,
            error_kind: None,
            error_message: None,
            warnings: Vec::new(),
            artifacts: Vec::new(),
            translated_summary: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What a finished job hands back
#[derive(Debug, Clone, Default)]
pub struct JobCompletion {
    pub warnings: Vec<String>,
    pub artifacts: Vec<Artifact>,
    pub translated_summary: Option<String>,
}
