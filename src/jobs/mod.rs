// Background job model
//
// Requests are queued on a bounded channel and processed by `JobWorker`;
// clients poll the repository for status.

pub mod job;
pub mod repository;
pub mod status;
pub mod worker;

pub use job::{Job, JobCompletion, JobId, JobKind};
pub use repository::{InMemoryJobRepository, JobRepository};
pub use status::JobStatus;
pub use worker::{JobMessage, JobPayload, JobQueue, JobRunner, JobWorker, QueueSlot};
