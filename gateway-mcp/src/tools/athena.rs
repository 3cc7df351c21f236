//! Athena MCP tools
//!
//! Query execution and catalog browsing against the configured workgroup.
//! Every query gets a fresh result location so concurrent calls never share
//! output objects.

use crate::clients::athena::{QueryEngine, QueryRequest};
use crate::clients::config::AthenaConfig;
use crate::error::GatewayResult;
use crate::format::{bullet_list, markdown_table, TabularResult, DEFAULT_MAX_ROWS};
use crate::schema::ParamSpec;
use crate::server::Tool;
use crate::types::{ToolDefinition, ToolResult};
use crate::validation::ValidatedArgs;
use async_trait::async_trait;
use gateway_policy::Service;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::at_least_one;

/// Table the sample tool reads from.
pub const SAMPLE_TABLE: &str = "bid_pricer_log";

/// Default row limit for sample queries.
pub const DEFAULT_SAMPLE_LIMIT: i64 = 1000;

/// Shared state for every Athena tool.
#[derive(Clone)]
struct AthenaContext {
    engine: Arc<dyn QueryEngine>,
    config: Arc<AthenaConfig>,
}

impl AthenaContext {
    fn database_param(&self, description: &str) -> ParamSpec {
        ParamSpec::string(
            "database",
            format!("{} (default: {})", description, self.config.database),
        )
        .with_default(self.config.database.clone())
    }

    async fn run(&self, sql: String, database: &str) -> GatewayResult<TabularResult> {
        let request = QueryRequest {
            sql,
            database: database.to_string(),
            output_location: self.config.fresh_output_location(),
        };
        self.engine.run_query(request).await
    }
}

/// Tool to run arbitrary SQL.
pub struct QueryTool {
    ctx: AthenaContext,
}

#[async_trait]
impl Tool for QueryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "athena_query",
            "Execute a SQL query against AWS Athena.\n\n\
             The query should be valid Presto/Trino SQL and is run as written. \
             Results are returned as a markdown table.\n\n\
             Tips:\n\
             - Always include WHERE clauses to limit data scanned\n\
             - Use LIMIT to restrict result set size\n\
             - server_timestamp is commonly used for time-based filtering",
        )
        .with_service(Service::Athena)
        .with_param(ParamSpec::string("query", "The SQL query to execute").required())
        .with_param(self.ctx.database_param("The Athena database to query"))
        .with_param(
            ParamSpec::integer("max_rows", "Maximum rows to return in output (default: 100)")
                .with_default(DEFAULT_MAX_ROWS as i64),
        )
    }

    #[instrument(skip(self, args), fields(tool = "athena_query"))]
    async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult> {
        let sql = args.str("query")?.to_string();
        let database = args.str("database")?;
        let max_rows = at_least_one(args.int("max_rows")?);

        let table = self.ctx.run(sql, database).await?;

        let mut output = format!("**Query Results** ({} rows)\n\n", table.row_count());
        output.push_str(&markdown_table(&table, max_rows));
        Ok(ToolResult::text(output))
    }
}

/// Tool to list catalog databases.
pub struct ListDatabasesTool {
    ctx: AthenaContext,
}

#[async_trait]
impl Tool for ListDatabasesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("athena_list_databases", "List all available databases in Athena.")
            .with_service(Service::Athena)
    }

    #[instrument(skip(self, _args), fields(tool = "athena_list_databases"))]
    async fn execute(&self, _args: ValidatedArgs) -> GatewayResult<ToolResult> {
        let databases = self.ctx.engine.list_databases().await?;
        debug!(count = databases.len(), "Listed databases");

        let mut output = String::from("**Available Databases**\n\n");
        output.push_str(&bullet_list(&databases));
        Ok(ToolResult::text(output))
    }
}

/// Tool to list the tables of one database.
pub struct ListTablesTool {
    ctx: AthenaContext,
}

#[async_trait]
impl Tool for ListTablesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("athena_list_tables", "List all tables in a specific Athena database.")
            .with_service(Service::Athena)
            .with_param(self.ctx.database_param("The database to list tables from"))
    }

    #[instrument(skip(self, args), fields(tool = "athena_list_tables"))]
    async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult> {
        let database = args.str("database")?;
        let tables = self.ctx.engine.list_tables(database).await?;

        let mut output = format!("**Tables in {}**\n\n", database);
        if tables.is_empty() {
            output.push_str("No tables found.");
        } else {
            output.push_str(&bullet_list(&tables));
        }
        Ok(ToolResult::text(output))
    }
}

/// Tool to show a table's columns.
pub struct DescribeTableTool {
    ctx: AthenaContext,
}

#[async_trait]
impl Tool for DescribeTableTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "athena_describe_table",
            "Get the schema/structure of a specific Athena table.",
        )
        .with_service(Service::Athena)
        .with_param(ParamSpec::string("table", "The table name to describe").required())
        .with_param(self.ctx.database_param("The database containing the table"))
    }

    #[instrument(skip(self, args), fields(tool = "athena_describe_table"))]
    async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult> {
        let table = args.str("table")?;
        let database = args.str("database")?;
        let columns = self.ctx.engine.describe_table(database, table).await?;

        let mut schema = TabularResult::new(["Column", "Type", "Comment"]);
        for column in columns {
            let comment = match (column.comment.as_deref(), column.partition_key) {
                (Some(comment), true) if !comment.is_empty() => {
                    format!("{} (partition key)", comment)
                }
                (_, true) => "(partition key)".to_string(),
                (comment, false) => comment.unwrap_or_default().to_string(),
            };
            schema.push_row([column.name, column.data_type, comment]);
        }

        let mut output = format!("**Schema for {}.{}**\n\n", database, table);
        output.push_str(&markdown_table(&schema, usize::MAX));
        Ok(ToolResult::text(output))
    }
}

/// A recognised sample-query filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleFilter {
    /// Country code, e.g. `US`.
    Country(String),
    /// App name.
    App(String),
}

impl SampleFilter {
    /// SQL predicate for this filter.
    ///
    /// The value is interpolated as-is; callers can inject SQL through it.
    pub fn clause(&self) -> String {
        match self {
            SampleFilter::Country(country) => format!("context.country = '{}'", country),
            SampleFilter::App(app) => format!("context.app = '{}'", app),
        }
    }

    /// Report line describing this filter.
    pub fn label(&self) -> String {
        match self {
            SampleFilter::Country(country) => format!("Country: {}", country),
            SampleFilter::App(app) => format!("App: {}", app),
        }
    }
}

/// A bid pricer log sample over a time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleQuery {
    /// Window start, `YYYY-MM-DD HH:MM:SS` UTC.
    pub start: String,
    /// Window end, `YYYY-MM-DD HH:MM:SS` UTC.
    pub end: String,
    /// Extra filters, ANDed together.
    pub filters: Vec<SampleFilter>,
    /// Row limit.
    pub limit: usize,
}

impl SampleQuery {
    /// Render the query text.
    pub fn to_sql(&self) -> String {
        let mut predicates = vec![format!(
            "bpl.server_timestamp BETWEEN TIMESTAMP '{}' AND TIMESTAMP '{}'",
            self.start, self.end
        )];
        predicates.extend(self.filters.iter().map(SampleFilter::clause));

        format!(
            "SELECT\n    \
                 bid_id,\n    \
                 CAST(bpl.server_timestamp AS TIMESTAMP) AS server_timestamp,\n    \
                 context.country,\n    \
                 context.app,\n    \
                 mediation,\n    \
                 JSON_FORMAT(CAST(win_proba_curve AS JSON)) AS win_proba_curve,\n    \
                 response.bid,\n    \
                 response.promoted_entity,\n    \
                 optimizer.naive_base_reward AS reward\n\
             FROM {} bpl\n\
             WHERE {}\n\
             AND win_proba_curve.bid_samples IS NOT NULL\n\
             LIMIT {}",
            SAMPLE_TABLE,
            predicates.join(" AND "),
            self.limit
        )
    }
}

/// Tool to sample the bid pricer log.
pub struct SampleQueryTool {
    ctx: AthenaContext,
}

impl SampleQueryTool {
    fn query(args: &ValidatedArgs) -> GatewayResult<SampleQuery> {
        let mut filters = Vec::new();
        if let Some(country) = args.opt_str("country")? {
            filters.push(SampleFilter::Country(country.to_string()));
        }
        if let Some(app) = args.opt_str("app")? {
            filters.push(SampleFilter::App(app.to_string()));
        }

        Ok(SampleQuery {
            start: args.str("start_timestamp")?.to_string(),
            end: args.str("end_timestamp")?.to_string(),
            filters,
            limit: at_least_one(args.int("limit")?),
        })
    }
}

#[async_trait]
impl Tool for SampleQueryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "athena_sample_query",
            "Get sample data from the bid_pricer_log table.\n\n\
             Convenience tool for quickly fetching auction log samples: timestamps, \
             countries, apps, bid amounts and win probability curves.",
        )
        .with_service(Service::Athena)
        .with_param(
            ParamSpec::string(
                "start_timestamp",
                "Start of time window in UTC (format: YYYY-MM-DD HH:MM:SS)",
            )
            .required(),
        )
        .with_param(
            ParamSpec::string(
                "end_timestamp",
                "End of time window in UTC (format: YYYY-MM-DD HH:MM:SS)",
            )
            .required(),
        )
        .with_param(ParamSpec::string(
            "country",
            "Optional: Filter by country code (e.g., 'US', 'FR')",
        ))
        .with_param(ParamSpec::string("app", "Optional: Filter by app name"))
        .with_param(
            ParamSpec::integer("limit", "Maximum number of records (default: 1000)")
                .with_default(DEFAULT_SAMPLE_LIMIT),
        )
    }

    #[instrument(skip(self, args), fields(tool = "athena_sample_query"))]
    async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult> {
        let query = Self::query(&args)?;
        let database = self.ctx.config.database.clone();
        let table = self.ctx.run(query.to_sql(), &database).await?;

        let mut output = format!("**Bid Pricer Log Sample** ({} rows)\n\n", table.row_count());
        output.push_str(&format!("Time range: {} to {}\n", query.start, query.end));
        for filter in &query.filters {
            output.push_str(&filter.label());
            output.push('\n');
        }
        output.push('\n');
        output.push_str(&markdown_table(&table, DEFAULT_MAX_ROWS));
        Ok(ToolResult::text(output))
    }
}

/// Get all Athena tools.
pub fn athena_tools(engine: Arc<dyn QueryEngine>, config: Arc<AthenaConfig>) -> Vec<Arc<dyn Tool>> {
    let ctx = AthenaContext { engine, config };
    vec![
        Arc::new(QueryTool { ctx: ctx.clone() }),
        Arc::new(ListDatabasesTool { ctx: ctx.clone() }),
        Arc::new(ListTablesTool { ctx: ctx.clone() }),
        Arc::new(DescribeTableTool { ctx: ctx.clone() }),
        Arc::new(SampleQueryTool { ctx }),
    ]
}
