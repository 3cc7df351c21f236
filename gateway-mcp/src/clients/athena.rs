//! Athena query engine client.
//!
//! Wraps the AWS SDK behind the [`QueryEngine`] trait so tool handlers can
//! run against an in-memory engine in tests. A query is submitted with its
//! own result location, polled until it leaves the queue, then read back
//! page by page.

use super::config::AthenaConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::format::TabularResult;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_athena::Client;
use gateway_policy::Service;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Rows requested per `GetQueryResults` page (the API maximum).
const RESULT_PAGE_SIZE: i32 = 1000;

/// Athena client errors.
#[derive(Debug, Error)]
pub enum AthenaError {
    /// An SDK call failed.
    #[error("{operation} failed: {message}")]
    Sdk {
        /// API operation name.
        operation: &'static str,
        /// Rendered SDK error chain.
        message: String,
    },

    /// The query finished in a failed or cancelled state.
    #[error("Query {state}: {reason}")]
    QueryFailed {
        /// Terminal state.
        state: String,
        /// Reason reported by Athena.
        reason: String,
    },

    /// A response lacked a field the protocol guarantees.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl AthenaError {
    fn sdk<E>(operation: &'static str, err: E) -> Self
    where
        E: std::error::Error,
    {
        AthenaError::Sdk {
            operation,
            message: DisplayErrorContext(err).to_string(),
        }
    }
}

impl From<AthenaError> for GatewayError {
    fn from(err: AthenaError) -> Self {
        GatewayError::upstream(Service::Athena, err.to_string())
    }
}

/// A query submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// SQL text, run verbatim.
    pub sql: String,
    /// Database the query runs against.
    pub database: String,
    /// Result location unique to this submission.
    pub output_location: String,
}

/// One column of a table's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub data_type: String,
    /// Column comment, if any.
    pub comment: Option<String>,
    /// Whether the column is a partition key.
    pub partition_key: bool,
}

/// The query engine and data catalog the Athena tools run against.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Run a query to completion and return every row.
    async fn run_query(&self, request: QueryRequest) -> GatewayResult<TabularResult>;

    /// Names of all databases in the catalog.
    async fn list_databases(&self) -> GatewayResult<Vec<String>>;

    /// Names of all tables in a database.
    async fn list_tables(&self, database: &str) -> GatewayResult<Vec<String>>;

    /// Columns of a table, partition keys last.
    async fn describe_table(
        &self,
        database: &str,
        table: &str,
    ) -> GatewayResult<Vec<ColumnDescription>>;
}

/// AWS Athena client.
#[derive(Clone)]
pub struct AthenaClient {
    client: Client,
    workgroup: String,
    catalog: String,
    poll_interval: std::time::Duration,
}

impl AthenaClient {
    /// Build a client from the named profile and region.
    pub async fn connect(config: &AthenaConfig) -> Self {
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&config.profile_name)
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        info!(
            profile = %config.profile_name,
            region = %config.region,
            workgroup = %config.workgroup,
            "Athena client configured"
        );
        Self::from_client(Client::new(&shared_config), config)
    }

    /// Wrap an existing SDK client.
    pub fn from_client(client: Client, config: &AthenaConfig) -> Self {
        Self {
            client,
            workgroup: config.workgroup.clone(),
            catalog: config.catalog.clone(),
            poll_interval: config.poll_interval(),
        }
    }

    async fn start(&self, request: &QueryRequest) -> Result<String, AthenaError> {
        let context = QueryExecutionContext::builder()
            .database(&request.database)
            .catalog(&self.catalog)
            .build();
        let output = ResultConfiguration::builder()
            .output_location(&request.output_location)
            .build();

        let started = self
            .client
            .start_query_execution()
            .query_string(&request.sql)
            .work_group(&self.workgroup)
            .query_execution_context(context)
            .result_configuration(output)
            .send()
            .await
            .map_err(|e| AthenaError::sdk("StartQueryExecution", e))?;

        started
            .query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| AthenaError::InvalidResponse("missing query execution id".to_string()))
    }

    async fn wait(&self, execution_id: &str) -> Result<(), AthenaError> {
        loop {
            let execution = self
                .client
                .get_query_execution()
                .query_execution_id(execution_id)
                .send()
                .await
                .map_err(|e| AthenaError::sdk("GetQueryExecution", e))?;

            let status = execution
                .query_execution()
                .and_then(|execution| execution.status());
            let state = status.and_then(|status| status.state());

            match state {
                Some(QueryExecutionState::Succeeded) => return Ok(()),
                Some(QueryExecutionState::Failed) | Some(QueryExecutionState::Cancelled) => {
                    let reason = status
                        .and_then(|status| status.state_change_reason())
                        .unwrap_or("no reason given")
                        .to_string();
                    return Err(AthenaError::QueryFailed {
                        state: state.map(|s| s.as_str().to_string()).unwrap_or_default(),
                        reason,
                    });
                }
                other => {
                    debug!(state = ?other, "Query still running");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn fetch(&self, execution_id: &str) -> Result<TabularResult, AthenaError> {
        let mut table = TabularResult::default();
        let mut next_token: Option<String> = None;
        let mut first_page = true;

        loop {
            let page = self
                .client
                .get_query_results()
                .query_execution_id(execution_id)
                .max_results(RESULT_PAGE_SIZE)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AthenaError::sdk("GetQueryResults", e))?;

            let Some(result_set) = page.result_set() else {
                break;
            };

            if first_page {
                table.columns = result_set
                    .result_set_metadata()
                    .map(|meta| {
                        meta.column_info()
                            .iter()
                            .map(|column| column.name().to_string())
                            .collect()
                    })
                    .unwrap_or_default();
            }

            for (index, row) in result_set.rows().iter().enumerate() {
                let cells: Vec<Option<String>> = row
                    .data()
                    .iter()
                    .map(|datum| datum.var_char_value().map(str::to_string))
                    .collect();

                // SELECT results repeat the column names as the first row.
                if first_page && index == 0 && is_header_row(&cells, &table.columns) {
                    continue;
                }
                table.rows.push(cells);
            }

            first_page = false;
            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(table)
    }
}

fn is_header_row(cells: &[Option<String>], columns: &[String]) -> bool {
    !columns.is_empty()
        && cells.len() == columns.len()
        && cells
            .iter()
            .zip(columns)
            .all(|(cell, column)| cell.as_deref() == Some(column.as_str()))
}

#[async_trait]
impl QueryEngine for AthenaClient {
    #[instrument(skip(self, request), fields(database = %request.database, output = %request.output_location))]
    async fn run_query(&self, request: QueryRequest) -> GatewayResult<TabularResult> {
        let execution_id = self.start(&request).await?;
        debug!(%execution_id, "Query submitted");

        if let Err(err) = self.wait(&execution_id).await {
            warn!(%execution_id, error = %err, "Query did not succeed");
            return Err(err.into());
        }

        let table = self.fetch(&execution_id).await?;
        info!(%execution_id, rows = table.row_count(), "Query completed");
        Ok(table)
    }

    #[instrument(skip(self))]
    async fn list_databases(&self) -> GatewayResult<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_databases()
                .catalog_name(&self.catalog)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AthenaError::sdk("ListDatabases", e))?;

            names.extend(page.database_list().iter().map(|db| db.name().to_string()));

            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(names)
    }

    #[instrument(skip(self))]
    async fn list_tables(&self, database: &str) -> GatewayResult<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_table_metadata()
                .catalog_name(&self.catalog)
                .database_name(database)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AthenaError::sdk("ListTableMetadata", e))?;

            names.extend(
                page.table_metadata_list()
                    .iter()
                    .map(|table| table.name().to_string()),
            );

            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(names)
    }

    #[instrument(skip(self))]
    async fn describe_table(
        &self,
        database: &str,
        table: &str,
    ) -> GatewayResult<Vec<ColumnDescription>> {
        let output = self
            .client
            .get_table_metadata()
            .catalog_name(&self.catalog)
            .database_name(database)
            .table_name(table)
            .send()
            .await
            .map_err(|e| AthenaError::sdk("GetTableMetadata", e))?;

        let metadata = output
            .table_metadata()
            .ok_or_else(|| AthenaError::InvalidResponse("missing table metadata".to_string()))?;

        let describe = |column: &aws_sdk_athena::types::Column, partition_key: bool| {
            ColumnDescription {
                name: column.name().to_string(),
                data_type: column.r#type().unwrap_or_default().to_string(),
                comment: column.comment().map(str::to_string),
                partition_key,
            }
        };

        Ok(metadata
            .columns()
            .iter()
            .map(|column| describe(column, false))
            .chain(
                metadata
                    .partition_keys()
                    .iter()
                    .map(|column| describe(column, true)),
            )
            .collect())
    }
}
