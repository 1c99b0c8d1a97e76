use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::AppState;
use crate::acquire::validate_url;
use crate::error::{DublineError, ErrorKind};
use crate::jobs::{Job, JobId, JobKind, JobPayload};
use crate::pipeline::DubRequest;
use crate::store::RequestRecord;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub url: String,
    pub language: String,
    pub voice: String,
    pub email: Option<String>,
    pub school: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub url: String,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub success: bool,
    pub job_id: String,
    pub status_url: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub kind: ErrorKind,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

fn error_response(error: &DublineError) -> Response {
    let status = match error.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Queue => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: error.to_string(),
            kind: error.kind(),
        }),
    )
        .into_response()
}

fn accepted(job_id: JobId, message: &str) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            success: true,
            job_id: job_id.to_string(),
            status_url: format!("/jobs/{}", job_id),
            message: message.to_string(),
        }),
    )
        .into_response()
}

fn validate_email(email: Option<&str>) -> Result<(), DublineError> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(address) => address
            .parse::<lettre::Address>()
            .map(|_| ())
            .map_err(|e| DublineError::Validation(format!("invalid email '{}': {}", address, e))),
        None => Ok(()),
    }
}

#[tracing::instrument(skip(state, request), fields(url = %request.url))]
pub async fn translate_handler(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Response {
    let dub = DubRequest {
        url: request.url.trim().to_string(),
        language: request.language.clone(),
        voice: request.voice.clone(),
    };
    if let Err(e) = state
        .pipeline
        .resolve_voice(&dub)
        .and_then(|_| validate_email(request.email.as_deref()))
    {
        tracing::warn!(error = %e, "Rejected translation request");
        return error_response(&e);
    }

    let slot = match state.queue.reserve() {
        Ok(slot) => slot,
        Err(e) => {
            tracing::warn!(error = %e, "Job queue rejected translation request");
            return error_response(&e);
        }
    };

    let job = Job::new(JobId::new(), JobKind::Dub);
    let record = RequestRecord {
        job_id: job.id.as_uuid(),
        url: dub.url.clone(),
        language: request.language,
        voice: request.voice,
        email: request.email.clone(),
        school: request.school,
        district: request.district,
        state: request.state,
        requested_at: Utc::now(),
    };
    if let Err(e) = state.store.insert_async(record).await {
        tracing::error!(error = %e, "Failed to persist request record");
        return error_response(&e);
    }

    let payload = JobPayload::Dub {
        request: dub,
        email: request.email.filter(|e| !e.trim().is_empty()),
    };
    match slot.submit(&job, payload).await {
        Ok(job_id) => {
            tracing::info!(job_id = %job_id, "Translation job queued");
            accepted(job_id, "Translation job queued")
        }
        Err(e) => error_response(&e),
    }
}

#[tracing::instrument(skip(state, request), fields(url = %request.url))]
pub async fn summarize_handler(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Response {
    if let Err(e) = validate_url(&request.url) {
        return error_response(&e);
    }

    let slot = match state.queue.reserve() {
        Ok(slot) => slot,
        Err(e) => return error_response(&e),
    };

    let job = Job::new(JobId::new(), JobKind::Summarize);
    let payload = JobPayload::Summarize {
        url: request.url.trim().to_string(),
        language: request.language,
    };
    match slot.submit(&job, payload).await {
        Ok(job_id) => {
            tracing::info!(job_id = %job_id, "Summary job queued");
            accepted(job_id, "Summary job queued")
        }
        Err(e) => error_response(&e),
    }
}

#[tracing::instrument(skip(state))]
pub async fn job_status_handler(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    let uuid = match Uuid::parse_str(&job_id) {
        Ok(u) => u,
        Err(_) => {
            return error_response(&DublineError::Validation(format!("Invalid job ID: {}", job_id)));
        }
    };

    match state.queue.repository().get(JobId::from_uuid(uuid)).await {
        Ok(Some(job)) => (StatusCode::OK, Json(job)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                success: false,
                message: format!("Job not found: {}", job_id),
                kind: ErrorKind::Validation,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch job status");
            error_response(&e)
        }
    }
}

pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
        }),
    )
}
