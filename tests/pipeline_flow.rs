mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use dubline::error::{DublineError, ErrorKind};
use dubline::jobs::{
    InMemoryJobRepository, Job, JobId, JobKind, JobPayload, JobQueue, JobRepository, JobRunner,
    JobStatus, JobWorker,
};
use dubline::notify::Notifier;
use dubline::pipeline::{DubRequest, NoopListener, Stage, StageListener};
use dubline::workspace::{ArtifactKind, RunWorkspace};

use common::*;

fn request() -> DubRequest {
    DubRequest {
        url: "https://www.youtube.com/watch?v=abc123".to_string(),
        language: "Hindi".to_string(),
        voice: "female".to_string(),
    }
}

#[derive(Default)]
struct RecordingListener {
    stages: Mutex<Vec<Stage>>,
}

#[async_trait]
impl StageListener for RecordingListener {
    async fn on_stage(&self, stage: Stage) {
        self.stages.lock().await.push(stage);
    }
}

#[tokio::test]
async fn three_segments_produce_three_dialogues_and_gapped_track() {
    let root = assert_fs::TempDir::new().unwrap();
    let workspace = RunWorkspace::create(root.path(), Uuid::new_v4()).await.unwrap();
    let listener = RecordingListener::default();

    let pipeline = pipeline(FakeMedia::default(), FakeTranslator { fail_on: None });
    let outcome = pipeline.run(&request(), &workspace, &listener).await.unwrap();

    assert_eq!(outcome.language, "hi");
    assert!(outcome.warnings.is_empty());
    let translated: Vec<&str> = outcome.segments.iter().map(|s| s.translated_text.as_str()).collect();
    assert_eq!(translated, vec!["HELLO", "WORLD", "!"]);

    let subtitles = outcome.artifact(ArtifactKind::Subtitles).unwrap();
    let script = std::fs::read_to_string(&subtitles.path).unwrap();
    let dialogue: Vec<&str> = script.lines().filter(|l| l.starts_with("Dialogue:")).collect();
    assert_eq!(
        dialogue,
        vec![
            "Dialogue: 0,00:00:00.000,00:00:02.000,Default,HELLO",
            "Dialogue: 0,00:00:02.000,00:00:05.000,Default,WORLD",
            "Dialogue: 0,00:00:05.000,00:00:05.500,Default,!",
        ]
    );

    let dubbed = outcome.artifact(ArtifactKind::DubbedAudio).unwrap();
    let reader = hound::WavReader::open(&dubbed.path).unwrap();
    assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
    assert_eq!(
        reader.len() as usize,
        sped_up_len(5) + sped_up_len(5) + sped_up_len(1) + 3 * GAP_SAMPLES
    );

    assert!(outcome.artifact(ArtifactKind::FinalVideo).is_some());
    assert!(outcome.artifact(ArtifactKind::SubtitledVideo).is_none());
    assert!(outcome.artifacts.iter().all(|a| a.path.starts_with(workspace.dir())));

    assert_eq!(
        *listener.stages.lock().await,
        vec![
            Stage::Acquiring,
            Stage::ExtractingAudio,
            Stage::Transcribing,
            Stage::Translating,
            Stage::Synthesizing,
            Stage::GeneratingSubtitles,
            Stage::Muxing,
            Stage::Done,
        ]
    );
}

#[tokio::test]
async fn translation_failure_on_second_segment_leaves_no_outputs() {
    let root = assert_fs::TempDir::new().unwrap();
    let workspace = RunWorkspace::create(root.path(), Uuid::new_v4()).await.unwrap();

    let pipeline = pipeline(FakeMedia::default(), FakeTranslator { fail_on: Some("world") });
    let err = pipeline.run(&request(), &workspace, &NoopListener).await.unwrap_err();

    match &err {
        DublineError::Translation { segment, message, .. } => {
            assert_eq!(*segment, Some(2));
            assert!(message.contains("world"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::Translation);
    assert!(!workspace.artifact(ArtifactKind::Subtitles).exists());
    assert!(!workspace.artifact(ArtifactKind::DubbedAudio).exists());
    assert!(!workspace.artifact(ArtifactKind::FinalVideo).exists());
}

#[tokio::test]
async fn mux_failure_is_reported_as_warning() {
    let root = assert_fs::TempDir::new().unwrap();
    let workspace = RunWorkspace::create(root.path(), Uuid::new_v4()).await.unwrap();

    let pipeline = pipeline(FakeMedia::failing_mux(), FakeTranslator { fail_on: None });
    let outcome = assert_ok!(pipeline.run(&request(), &workspace, &NoopListener).await);

    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("ffmpeg exited"));
    assert!(outcome.artifact(ArtifactKind::FinalVideo).is_none());
    assert!(outcome.artifact(ArtifactKind::Subtitles).is_some());
}

#[tokio::test]
async fn burn_in_adds_subtitled_video() {
    let root = assert_fs::TempDir::new().unwrap();
    let workspace = RunWorkspace::create(root.path(), Uuid::new_v4()).await.unwrap();

    let pipeline =
        pipeline(FakeMedia::default(), FakeTranslator { fail_on: None }).with_burn_subtitles(true);
    let outcome = pipeline.run(&request(), &workspace, &NoopListener).await.unwrap();
    assert!(outcome.artifact(ArtifactKind::SubtitledVideo).is_some());

    let delivered: Vec<ArtifactKind> = outcome.deliverables().iter().map(|a| a.kind).collect();
    assert_eq!(
        delivered,
        vec![
            ArtifactKind::FinalVideo,
            ArtifactKind::SubtitledVideo,
            ArtifactKind::Subtitles
        ]
    );
}

#[tokio::test]
async fn dependency_check_covers_every_external_service() {
    let pipeline = pipeline(FakeMedia::default(), FakeTranslator { fail_on: None });
    let versions = pipeline.check_dependencies().await.unwrap();
    assert_eq!(versions, vec!["ffmpeg fake", "yt-dlp fake", "tts fake"]);
}

#[tokio::test]
async fn runs_do_not_share_files() {
    let root = assert_fs::TempDir::new().unwrap();
    let first = RunWorkspace::create(root.path(), Uuid::new_v4()).await.unwrap();
    let second = RunWorkspace::create(root.path(), Uuid::new_v4()).await.unwrap();

    let pipeline = pipeline(FakeMedia::default(), FakeTranslator { fail_on: None });
    let (request_a, request_b) = (request(), request());
    let (a, b) = tokio::join!(
        pipeline.run(&request_a, &first, &NoopListener),
        pipeline.run(&request_b, &second, &NoopListener)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(first.dir(), second.dir());
    let sub_a = a.artifact(ArtifactKind::Subtitles).unwrap();
    let sub_b = b.artifact(ArtifactKind::Subtitles).unwrap();
    assert_ne!(sub_a.path, sub_b.path);
    assert!(sub_a.exists() && sub_b.exists());
}

#[tokio::test]
async fn invalid_requests_fail_before_download() {
    let root = assert_fs::TempDir::new().unwrap();
    let workspace = RunWorkspace::create(root.path(), Uuid::new_v4()).await.unwrap();
    let pipeline = pipeline(FakeMedia::default(), FakeTranslator { fail_on: None });

    let bad_url = DubRequest {
        url: "ftp://example.org/video".to_string(),
        ..request()
    };
    let err = assert_err!(pipeline.run(&bad_url, &workspace, &NoopListener).await);
    assert_eq!(err.kind(), ErrorKind::Validation);

    let bad_voice = DubRequest {
        language: "French".to_string(),
        voice: "male".to_string(),
        ..request()
    };
    let err = assert_err!(pipeline.run(&bad_voice, &workspace, &NoopListener).await);
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!workspace.artifact(ArtifactKind::SourceVideo).exists());
}

async fn wait_for_terminal(repository: &Arc<dyn JobRepository>, id: JobId) -> Job {
    for _ in 0..200 {
        if let Some(job) = repository.get(id).await.unwrap() {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish");
}

#[tokio::test]
async fn worker_runs_dub_and_summary_jobs() {
    let root = assert_fs::TempDir::new().unwrap();
    let repository: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let (queue, receiver) = JobQueue::channel(8, Arc::clone(&repository));

    let runner = JobRunner {
        pipeline: Arc::new(pipeline(FakeMedia::default(), FakeTranslator { fail_on: None })),
        summarizer: Arc::new(summarizer()),
        repository: Arc::clone(&repository),
        notifier: None,
        workspace_root: root.path().to_path_buf(),
        keep_artifacts: false,
    };
    tokio::spawn(JobWorker::new(receiver, runner, 2).run());

    let dub = Job::new(JobId::new(), JobKind::Dub);
    queue
        .reserve()
        .unwrap()
        .submit(
            &dub,
            JobPayload::Dub {
                request: request(),
                email: Some("teacher@school.in".to_string()),
            },
        )
        .await
        .unwrap();

    let summary = Job::new(JobId::new(), JobKind::Summarize);
    queue
        .reserve()
        .unwrap()
        .submit(
            &summary,
            JobPayload::Summarize {
                url: "https://youtu.be/abc".to_string(),
                language: Some("mr".to_string()),
            },
        )
        .await
        .unwrap();

    let dub = wait_for_terminal(&repository, dub.id).await;
    assert_eq!(dub.status, JobStatus::Completed);
    assert!(dub.warnings.iter().any(|w| w.contains("mail delivery is disabled")));
    assert!(dub.artifacts.iter().any(|a| a.kind == ArtifactKind::FinalVideo));
    // undelivered results stay on disk
    assert!(root.path().join(dub.id.to_string()).is_dir());

    let summary = wait_for_terminal(&repository, summary.id).await;
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(
        summary.translated_summary.as_deref(),
        Some("SUMMARY OF: HELLO WORLD !")
    );
    assert!(!root.path().join(summary.id.to_string()).exists());
}

#[tokio::test]
async fn worker_records_failure_kind() {
    let root = assert_fs::TempDir::new().unwrap();
    let repository: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let (queue, receiver) = JobQueue::channel(2, Arc::clone(&repository));

    let runner = JobRunner {
        pipeline: Arc::new(pipeline(FakeMedia::default(), FakeTranslator { fail_on: Some("world") })),
        summarizer: Arc::new(summarizer()),
        repository: Arc::clone(&repository),
        notifier: None,
        workspace_root: root.path().to_path_buf(),
        keep_artifacts: false,
    };
    tokio::spawn(JobWorker::new(receiver, runner, 1).run());

    let job = Job::new(JobId::new(), JobKind::Dub);
    queue
        .reserve()
        .unwrap()
        .submit(&job, JobPayload::Dub { request: request(), email: None })
        .await
        .unwrap();

    let job = wait_for_terminal(&repository, job.id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_kind, Some(ErrorKind::Translation));
    assert!(job.error_message.unwrap().contains("segment 2"));
    assert!(!root.path().join(job.id.to_string()).exists());
}

fn dub_runner(
    root: &assert_fs::TempDir,
    repository: &Arc<dyn JobRepository>,
    notifier: Arc<RecordingNotifier>,
) -> JobRunner {
    JobRunner {
        pipeline: Arc::new(
            pipeline(FakeMedia::default(), FakeTranslator { fail_on: None }).with_burn_subtitles(true),
        ),
        summarizer: Arc::new(summarizer()),
        repository: Arc::clone(repository),
        notifier: Some(notifier as Arc<dyn Notifier>),
        workspace_root: root.path().to_path_buf(),
        keep_artifacts: false,
    }
}

async fn submit_dub(queue: &JobQueue) -> JobId {
    let job = Job::new(JobId::new(), JobKind::Dub);
    queue
        .reserve()
        .unwrap()
        .submit(
            &job,
            JobPayload::Dub {
                request: request(),
                email: Some("teacher@school.in".to_string()),
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn delivered_job_mails_burned_in_video_then_removes_run_dir() {
    let root = assert_fs::TempDir::new().unwrap();
    let repository: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let (queue, receiver) = JobQueue::channel(2, Arc::clone(&repository));
    let notifier = Arc::new(RecordingNotifier::default());
    tokio::spawn(JobWorker::new(receiver, dub_runner(&root, &repository, Arc::clone(&notifier)), 1).run());

    let id = submit_dub(&queue).await;
    let job = wait_for_terminal(&repository, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    let deliveries = notifier.delivered();
    assert_eq!(deliveries.len(), 1);
    let (recipient, kinds) = &deliveries[0];
    assert_eq!(recipient, "teacher@school.in");
    assert!(kinds.contains(&ArtifactKind::SubtitledVideo));
    assert!(kinds.contains(&ArtifactKind::FinalVideo));
    assert!(kinds.contains(&ArtifactKind::Subtitles));
    assert!(!root.path().join(id.to_string()).exists());
}

#[tokio::test]
async fn failed_delivery_fails_job_and_keeps_run_dir() {
    let root = assert_fs::TempDir::new().unwrap();
    let repository: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let (queue, receiver) = JobQueue::channel(2, Arc::clone(&repository));
    let notifier = Arc::new(RecordingNotifier::failing());
    tokio::spawn(JobWorker::new(receiver, dub_runner(&root, &repository, Arc::clone(&notifier)), 1).run());

    let id = submit_dub(&queue).await;
    let job = wait_for_terminal(&repository, id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_kind, Some(ErrorKind::Delivery));
    assert!(notifier.delivered().is_empty());
    let run_dir = root.path().join(id.to_string());
    assert!(run_dir.join(ArtifactKind::SubtitledVideo.file_name()).is_file());
}
