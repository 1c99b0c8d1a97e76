use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{DublineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    SourceVideo,
    ExtractedAudio,
    DubbedAudio,
    Subtitles,
    FinalVideo,
    SubtitledVideo,
}

impl ArtifactKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::SourceVideo => "source.mp4",
            ArtifactKind::ExtractedAudio => "audio.mp3",
            ArtifactKind::DubbedAudio => "dubbed_audio.wav",
            ArtifactKind::Subtitles => "subtitles.ass",
            ArtifactKind::FinalVideo => "final_output_video.mp4",
            ArtifactKind::SubtitledVideo => "final_output_subtitled.mp4",
        }
    }
}

/// A file produced by a run, owned by that run's workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl Artifact {
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Working directory private to a single pipeline run.
#[derive(Debug, Clone)]
pub struct RunWorkspace {
    run_id: Uuid,
    dir: PathBuf,
}

impl RunWorkspace {
    pub async fn create<P: AsRef<Path>>(root: P, run_id: Uuid) -> Result<Self> {
        let dir = root.as_ref().join(run_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Created run workspace {}", dir.display());
        Ok(Self { run_id, dir })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Artifact {
        Artifact {
            kind,
            path: self.dir.join(kind.file_name()),
        }
    }

    /// Temporary directory inside the run, removed when the handle drops.
    pub fn scratch(&self) -> Result<tempfile::TempDir> {
        tempfile::Builder::new()
            .prefix("scratch-")
            .tempdir_in(&self.dir)
            .map_err(DublineError::Io)
    }

    pub async fn cleanup(self) -> Result<()> {
        tokio::fs::remove_dir_all(&self.dir).await?;
        info!("Removed run workspace {}", self.dir.display());
        Ok(())
    }
}

/// Remove run directories under `root` untouched for longer than `max_age`.
pub fn prune_stale_runs<P: AsRef<Path>>(root: P, max_age: Duration) -> Result<usize> {
    let root = root.as_ref();
    if !root.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let modified = match entry.metadata().ok().and_then(|m| m.modified().ok()) {
            Some(modified) => modified,
            None => continue,
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            match std::fs::remove_dir_all(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove stale run {}: {}", entry.path().display(), e),
            }
        }
    }

    if removed > 0 {
        info!("Pruned {} stale run directories", removed);
    }
    Ok(removed)
}
