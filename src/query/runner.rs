use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

use super::{Job, JobId, JobStatus, QueryRequest, QueryService, ResultPage};
use crate::common::errors::{Error, ExecutionError, Result};

pub const POLL_INTERVAL_DEFAULT: Duration = Duration::from_secs(1);
pub const MAX_POLL_ATTEMPTS_DEFAULT: u32 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Status checks allowed before giving up; `None` waits forever.
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL_DEFAULT,
            max_attempts: Some(MAX_POLL_ATTEMPTS_DEFAULT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub job_id: JobId,
    pub pages: usize,
    pub rows: usize,
}

/// Runs one query at a time against a [`QueryService`]: submit, wait for a
/// terminal state, then hand back the result pages.
pub struct QueryRunner<S> {
    service: S,
    poll: PollSettings,
}

impl<S: QueryService> QueryRunner<S> {
    pub fn new(service: S) -> Self {
        Self::with_poll_settings(service, PollSettings::default())
    }

    pub fn with_poll_settings(service: S, poll: PollSettings) -> Self {
        Self { service, poll }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn submit(&self, request: &QueryRequest) -> Result<JobId> {
        if request.query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        let job_id = self.service.start_query(request).await?;
        info!(%job_id, database = %request.database, "Query submitted");
        Ok(job_id)
    }

    /// Polls until the job is terminal. Every observed status is logged
    /// before the next check.
    pub async fn await_completion(&self, job_id: &JobId) -> Result<Job> {
        let mut attempts: u32 = 0;

        loop {
            let job = self.service.job(job_id).await?;
            attempts += 1;
            info!("The current status is: {}", job.status);

            match job.status {
                JobStatus::Succeeded => return Ok(job),
                JobStatus::Failed => {
                    let reason = job.failure_reason.unwrap_or_default();
                    return Err(ExecutionError::Failed(reason).into());
                }
                JobStatus::Cancelled => return Err(ExecutionError::Cancelled.into()),
                JobStatus::Pending | JobStatus::Running => {}
            }

            if self.poll.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(Error::Timeout {
                    job_id: job_id.to_string(),
                    attempts,
                });
            }

            tokio::time::sleep(self.poll.interval).await;
        }
    }

    /// Lazily pages through the results of a finished job.
    pub fn fetch_results(&self, job_id: &JobId) -> ResultPages<'_, S> {
        ResultPages {
            service: &self.service,
            job_id: job_id.clone(),
            cursor: Cursor::First,
        }
    }

    /// Submits the query, waits for it and writes every result row to `out`
    /// as comma-joined values. Null cells are written as empty strings.
    #[tracing::instrument(skip_all)]
    pub async fn run<W: Write>(&self, request: &QueryRequest, out: &mut W) -> Result<RunSummary> {
        info!("{}", request.query);

        let job_id = self.submit(request).await?;
        self.await_completion(&job_id).await?;

        let mut pages = self.fetch_results(&job_id);
        let mut summary = RunSummary {
            job_id: job_id.clone(),
            pages: 0,
            rows: 0,
        };

        while let Some(page) = pages.next_page().await? {
            if summary.pages == 0 {
                debug!(%job_id, columns = %column_names(&page), "Result columns");
            }
            write_rows(&page, out)?;
            summary.pages += 1;
            summary.rows += page.rows().len();
        }
        out.flush()?;

        info!(%job_id, pages = summary.pages, rows = summary.rows, "Results processed");
        Ok(summary)
    }
}

/// `name:type` per column, comma-joined.
fn column_names(page: &ResultPage) -> String {
    page.columns()
        .iter()
        .map(|column| format!("{}:{}", column.name, column.data_type))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_rows<W: Write>(page: &ResultPage, out: &mut W) -> Result<()> {
    for row in page.rows() {
        let line = row
            .iter()
            .map(|cell| cell.as_deref().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{line}")?;
    }
    Ok(())
}

enum Cursor {
    First,
    Next(String),
    Done,
}

/// Forward-only cursor over the result pages of one job. Once the last page
/// (or an error) has been returned it yields nothing more.
pub struct ResultPages<'a, S> {
    service: &'a S,
    job_id: JobId,
    cursor: Cursor,
}

impl<'a, S: QueryService> ResultPages<'a, S> {
    pub async fn next_page(&mut self) -> Result<Option<ResultPage>> {
        let next_token = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::First => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok(None),
        };

        let page = self.service.results_page(&self.job_id, next_token).await?;
        debug!(
            job_id = %self.job_id,
            rows = page.rows().len(),
            last = page.next_token().is_none(),
            "Fetched result page"
        );

        if let Some(token) = page.next_token() {
            self.cursor = Cursor::Next(token.to_owned());
        }

        Ok(Some(page))
    }
}
