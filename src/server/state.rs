use std::sync::Arc;

use crate::jobs::JobQueue;
use crate::pipeline::Pipeline;
use crate::store::SqliteRequestStore;

#[derive(Clone)]
pub struct AppState {
    pub queue: JobQueue,
    pub store: SqliteRequestStore,
    /// Used to validate requests before they are queued
    pub pipeline: Arc<Pipeline>,
}
