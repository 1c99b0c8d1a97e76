// HTTP API
//
// POST /translate and POST /summarize queue background jobs and answer 202;
// GET /jobs/:id reports progress.

pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

use crate::config::Config;
use crate::error::Result;
use crate::jobs::{InMemoryJobRepository, JobQueue, JobRepository, JobRunner, JobWorker};
use crate::notify::{Mailer, Notifier};
use crate::pipeline::Pipeline;
use crate::store::SqliteRequestStore;
use crate::summarize::Summarizer;
use crate::workspace::prune_stale_runs;

pub use handlers::{health_handler, job_status_handler, summarize_handler, translate_handler};
pub use state::AppState;

/// Run directories older than this are removed at startup
const STALE_RUN_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route("/translate", post(translate_handler))
        .route("/summarize", post(summarize_handler))
        .route("/jobs/:id", get(job_status_handler))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

/// Start the worker and serve the API until the process is stopped.
pub async fn serve(config: Config) -> Result<()> {
    let store = SqliteRequestStore::new(&config.store.path)?;
    store.initialize()?;

    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    match pipeline.check_dependencies().await {
        Ok(versions) => {
            for version in versions {
                info!("Found {}", version);
            }
        }
        Err(e) => warn!("Dependency check failed, jobs may fail: {}", e),
    }

    let summarizer = Arc::new(Summarizer::from_config(&config)?);
    match summarizer.check_dependencies().await {
        Ok(versions) => {
            for version in versions {
                info!("Found {}", version);
            }
        }
        Err(e) => warn!("Summary dependency check failed, summary jobs may fail: {}", e),
    }

    match prune_stale_runs(&config.workspace.root, STALE_RUN_AGE) {
        Ok(0) => {}
        Ok(removed) => info!("Removed {} stale run directories", removed),
        Err(e) => warn!("Failed to prune stale runs: {}", e),
    }

    let notifier: Option<Arc<dyn Notifier>> = if config.mail.enabled {
        Some(Arc::new(Mailer::new(config.mail.clone())?))
    } else {
        info!("Mail delivery disabled");
        None
    };

    let repository: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::with_retention(
        Duration::from_secs(config.server.job_retention_secs),
        config.server.max_finished_jobs,
    ));
    let (queue, receiver) = JobQueue::channel(config.server.queue_capacity, Arc::clone(&repository));

    let runner = JobRunner {
        pipeline: Arc::clone(&pipeline),
        summarizer,
        repository,
        notifier,
        workspace_root: config.workspace.root.clone(),
        keep_artifacts: config.workspace.keep_artifacts,
    };
    let worker = JobWorker::new(receiver, runner, config.server.max_concurrent_jobs);
    tokio::spawn(worker.run());

    let router = create_router(AppState {
        queue,
        store,
        pipeline,
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}
