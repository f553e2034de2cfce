use aws_sdk_s3::error::BuildError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Reason a job ended in a terminal state other than success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("The Amazon Athena query failed to run with error message: {0}")]
    Failed(String),
    #[error("The Amazon Athena query was cancelled.")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("query text must not be empty")]
    EmptyQuery,
    #[error("query submission rejected: {0}")]
    Submission(String),
    #[error("failed to read status of job {job_id}: {message}")]
    Status { job_id: String, message: String },
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("job {job_id} did not finish after {attempts} status checks")]
    Timeout { job_id: String, attempts: u32 },
    #[error("failed to retrieve results: {0}")]
    Retrieval(String),
    #[error("inventory configuration rejected: {0}")]
    Configuration(String),
    #[error("pricing lookup failed: {0}")]
    Pricing(String),
    #[error("interrupted; a query already submitted keeps running")]
    Interrupted,
    #[error("failed to write results: {0}")]
    Output(#[from] std::io::Error),
    #[error("invalid request: {0}")]
    Build(#[from] BuildError),
}

impl Error {
    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::EmptyQuery
            | Error::Submission(_)
            | Error::Status { .. }
            | Error::Execution(_)
            | Error::Timeout { .. }
            | Error::Retrieval(_)
            | Error::Configuration(_)
            | Error::Pricing(_)
            | Error::Interrupted
            | Error::Output(_)
            | Error::Build(_) => 1,
        }
    }
}
