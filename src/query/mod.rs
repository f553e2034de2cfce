//! Asynchronous query jobs: submit, wait for a terminal state, then page
//! through the results.

mod athena;
mod runner;

use async_trait::async_trait;
use std::fmt;

use crate::common::errors::{Error, Result};

pub use athena::AthenaQueryService;
pub use runner::{
    PollSettings, QueryRunner, ResultPages, RunSummary, MAX_POLL_ATTEMPTS_DEFAULT,
    POLL_INTERVAL_DEFAULT,
};

pub const DATABASE_DEFAULT: &str = "DEFAULT";

/// Identifier assigned to a job by the query service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// Snapshot of a job as last reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
    pub output_location: String,
    pub database: String,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, output_location: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            output_location: output_location.into(),
            database: DATABASE_DEFAULT.into(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
}

/// `s3://bucket` or `s3://bucket/prefix` for query results.
pub fn output_location(bucket: &str, prefix: Option<&str>) -> String {
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("s3://{bucket}/{prefix}/"),
        None => format!("s3://{bucket}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

/// One page of tabular output. Every row has exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPage {
    columns: Vec<Column>,
    rows: Vec<Vec<Option<String>>>,
    next_token: Option<String>,
}

impl ResultPage {
    pub fn new(
        columns: Vec<Column>,
        rows: Vec<Vec<Option<String>>>,
        next_token: Option<String>,
    ) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(Error::Retrieval(format!(
                "row {index} has {} cells but the page has {} columns",
                row.len(),
                columns.len()
            )));
        }

        Ok(Self {
            columns,
            rows,
            next_token: next_token.filter(|token| !token.is_empty()),
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }
}

/// An external service that runs queries asynchronously.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn start_query(&self, request: &QueryRequest) -> Result<JobId>;

    async fn job(&self, job_id: &JobId) -> Result<Job>;

    /// Fetches the page after `next_token`, or the first page when `None`.
    async fn results_page(&self, job_id: &JobId, next_token: Option<String>)
        -> Result<ResultPage>;
}
