use thiserror::Error;

/// Label detection errors
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("Failed to start label detection for {key}: {reason}")]
    StartFailed { key: String, reason: String },

    #[error("Failed to fetch label detection job {job_id}: {reason}")]
    PollFailed { job_id: String, reason: String },

    #[error("Label detection job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Label detection job {job_id} still running after {attempts} attempts")]
    TimedOut { job_id: String, attempts: u32 },

    #[error("Provider accepted the label detection request for {key} without returning a job id")]
    MissingJobId { key: String },
}

/// Result type for label detection operations
pub type LabelResult<T> = Result<T, LabelError>;
