use async_trait::async_trait;
use aws_sdk_athena::types::{
    QueryExecutionContext, QueryExecutionState, ResultConfiguration, Row,
};
use tracing::warn;

use super::{Column, Job, JobId, JobStatus, QueryRequest, QueryService, ResultPage};
use crate::common::errors::{Error, Result};
use crate::common::utils::service_message;

/// Athena's upper bound for `MaxResults` on `GetQueryResults`.
pub const MAX_PAGE_SIZE: i32 = 1000;

/// [`QueryService`] backed by Amazon Athena.
#[derive(Debug, Clone)]
pub struct AthenaQueryService {
    client: aws_sdk_athena::Client,
    page_size: Option<i32>,
}

impl AthenaQueryService {
    pub fn new(client: aws_sdk_athena::Client) -> Self {
        Self {
            client,
            page_size: None,
        }
    }

    /// Rows per result page. Athena picks its maximum when unset.
    pub fn with_page_size(mut self, page_size: Option<i32>) -> Self {
        self.page_size = page_size.map(|size| size.clamp(1, MAX_PAGE_SIZE));
        self
    }
}

#[async_trait]
impl QueryService for AthenaQueryService {
    async fn start_query(&self, request: &QueryRequest) -> Result<JobId> {
        let context = QueryExecutionContext::builder()
            .database(&request.database)
            .build();
        let result_configuration = ResultConfiguration::builder()
            .output_location(&request.output_location)
            .build();

        let output = self
            .client
            .start_query_execution()
            .query_string(&request.query)
            .query_execution_context(context)
            .result_configuration(result_configuration)
            .send()
            .await
            .map_err(|err| Error::Submission(service_message(&err)))?;

        output
            .query_execution_id()
            .map(JobId::new)
            .ok_or_else(|| Error::Submission("no query execution id returned".into()))
    }

    async fn job(&self, job_id: &JobId) -> Result<Job> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(job_id.as_str())
            .send()
            .await
            .map_err(|err| Error::Status {
                job_id: job_id.to_string(),
                message: service_message(&err),
            })?;

        let Some(status) = output.query_execution().and_then(|qe| qe.status()) else {
            return Err(Error::Status {
                job_id: job_id.to_string(),
                message: "no status returned".into(),
            });
        };

        Ok(Job {
            id: job_id.clone(),
            status: status.state().map_or(JobStatus::Pending, job_status),
            failure_reason: status.state_change_reason().map(str::to_owned),
        })
    }

    async fn results_page(
        &self,
        job_id: &JobId,
        next_token: Option<String>,
    ) -> Result<ResultPage> {
        let output = self
            .client
            .get_query_results()
            .query_execution_id(job_id.as_str())
            .set_next_token(next_token)
            .set_max_results(self.page_size)
            .send()
            .await
            .map_err(|err| Error::Retrieval(service_message(&err)))?;

        let (columns, rows) = match output.result_set() {
            Some(result_set) => {
                let columns = result_set
                    .result_set_metadata()
                    .map(|metadata| {
                        metadata
                            .column_info()
                            .iter()
                            .map(|info| Column {
                                name: info.name().to_owned(),
                                data_type: info.r#type().to_owned(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let rows = result_set.rows().iter().map(cells).collect();
                (columns, rows)
            }
            None => (Vec::new(), Vec::new()),
        };

        ResultPage::new(columns, rows, output.next_token().map(str::to_owned))
    }
}

fn cells(row: &Row) -> Vec<Option<String>> {
    row.data()
        .iter()
        .map(|datum| datum.var_char_value().map(str::to_owned))
        .collect()
}

fn job_status(state: &QueryExecutionState) -> JobStatus {
    match state {
        QueryExecutionState::Queued => JobStatus::Pending,
        QueryExecutionState::Running => JobStatus::Running,
        QueryExecutionState::Succeeded => JobStatus::Succeeded,
        QueryExecutionState::Failed => JobStatus::Failed,
        QueryExecutionState::Cancelled => JobStatus::Cancelled,
        other => {
            warn!("Unrecognized query state {}, still waiting", other.as_str());
            JobStatus::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn athena_states_map_to_job_statuses() {
        assert_eq!(job_status(&QueryExecutionState::Queued), JobStatus::Pending);
        assert_eq!(job_status(&QueryExecutionState::Running), JobStatus::Running);
        assert_eq!(
            job_status(&QueryExecutionState::Succeeded),
            JobStatus::Succeeded
        );
        assert_eq!(job_status(&QueryExecutionState::Failed), JobStatus::Failed);
        assert_eq!(
            job_status(&QueryExecutionState::Cancelled),
            JobStatus::Cancelled
        );
        assert_eq!(
            job_status(&QueryExecutionState::from("PAUSED")),
            JobStatus::Pending
        );
    }
}
