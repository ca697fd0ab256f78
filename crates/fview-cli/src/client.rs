//! HTTP client for the Snowflake SQL API.
//!
//! [`SqlApiClient`] implements the warehouse capabilities the engine needs by
//! submitting one statement per request to `POST /api/v2/statements`. Reads
//! use `SHOW ... LIKE` and filter the rows by exact stored name, since `LIKE`
//! is case-insensitive and treats `_` as a wildcard.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use fview_catalog::ddl::{ObjectDomain, Statement};
use fview_catalog::warehouse::{
    EntityTagStore, ObservedState, TagDefinition, TagReference, TagReferenceStore, Warehouse,
};
use fview_core::{Error, Identifier, QualifiedName, Result, quote_literal};

use crate::Config;

/// Server-side statement timeout, in seconds.
const STATEMENT_TIMEOUT_SECS: u64 = 120;

/// Delay between polls of a statement still running asynchronously.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum polls before giving up on a running statement.
const MAX_POLLS: u32 = 240;

/// Snowflake SQL API client.
pub struct SqlApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    token_type: String,
    database: String,
    warehouse: Option<String>,
    role: Option<String>,
}

impl SqlApiClient {
    /// Creates a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no API URL is configured or the HTTP client cannot
    /// be constructed.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let base_url = config
            .api_url
            .clone()
            .context("API URL is required. Set SNOWFLAKE_ACCOUNT or FVIEW_API_URL")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(STATEMENT_TIMEOUT_SECS + 30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
            token_type: config.token_type.clone(),
            database: config.store.database.clone(),
            warehouse: config.store.default_warehouse.clone(),
            role: config.store.role.clone(),
        })
    }

    /// Runs one SQL statement and returns its result set.
    ///
    /// Statements the server accepts asynchronously are polled until they
    /// finish.
    ///
    /// # Errors
    ///
    /// Returns a warehouse error if the request fails, the API rejects the
    /// statement, or the statement does not finish in time.
    pub async fn query(&self, sql: &str) -> Result<ResultSet> {
        tracing::debug!(statement = sql, "submitting statement");

        let url = format!("{}/api/v2/statements", self.base_url);
        let body = StatementRequest {
            statement: sql,
            timeout: STATEMENT_TIMEOUT_SECS,
            database: Some(self.database.as_str()).filter(|db| !db.is_empty()),
            warehouse: self.warehouse.as_deref(),
            role: self.role.as_deref(),
        };

        let mut poll = self.send(self.client.post(&url).json(&body)).await?;
        for _ in 0..MAX_POLLS {
            let handle = match poll {
                Poll::Done(response) => return Ok(ResultSet::from_response(response)),
                Poll::Running(handle) => handle,
            };
            tokio::time::sleep(POLL_INTERVAL).await;
            poll = self
                .send(self.client.get(format!("{url}/{handle}")))
                .await?;
        }

        match poll {
            Poll::Done(response) => Ok(ResultSet::from_response(response)),
            Poll::Running(handle) => Err(Error::warehouse(format!(
                "statement {handle} still running after {MAX_POLLS} polls"
            ))),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Poll> {
        let mut req = request
            .header("Accept", "application/json")
            .header("X-Snowflake-Authorization-Token-Type", &self.token_type);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::warehouse_with_source("Failed to send request", e))?;
        read_response(response).await
    }
}

async fn read_response(response: Response) -> Result<Poll> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::warehouse(format!("API error ({status}): {body}")));
    }

    let parsed: StatementResponse = response
        .json()
        .await
        .map_err(|e| Error::warehouse_with_source("Failed to parse response", e))?;

    if status == StatusCode::ACCEPTED {
        let handle = parsed
            .statement_handle
            .ok_or_else(|| Error::warehouse("asynchronous response without a statement handle"))?;
        return Ok(Poll::Running(handle));
    }
    Ok(Poll::Done(parsed))
}

enum Poll {
    Done(StatementResponse),
    Running(String),
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

/// Response body of the statements endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    /// Handle of the statement.
    #[serde(default)]
    pub statement_handle: Option<String>,
    /// Status message.
    #[serde(default)]
    pub message: Option<String>,
    /// Column metadata, absent for some DDL responses.
    #[serde(default)]
    pub result_set_meta_data: Option<ResultSetMetaData>,
    /// Rows; every value is rendered as a string or null.
    #[serde(default)]
    pub data: Vec<Vec<Option<String>>>,
}

/// Result set metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetMetaData {
    /// Column descriptions, in row order.
    #[serde(default)]
    pub row_type: Vec<ColumnType>,
}

/// One column description.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnType {
    /// Column name as reported by the server.
    pub name: String,
}

/// Rows returned by one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    /// Builds a result set from a statement response.
    #[must_use]
    pub fn from_response(response: StatementResponse) -> Self {
        let columns = response
            .result_set_meta_data
            .map(|meta| meta.row_type.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();
        Self {
            columns,
            rows: response.data,
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates over the rows.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }
}

/// A row with by-name column access.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Option<String>],
}

impl<'a> Row<'a> {
    /// Returns the value of `column` (case-insensitive), if present and not null.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.values.get(index)?.as_deref()
    }
}

// ============================================================================
// SQL for reads
// ============================================================================

fn show_like(kind: &str, pattern: &str, schema_sql: &str) -> String {
    format!(
        "SHOW {kind} LIKE {} IN SCHEMA {schema_sql}",
        quote_literal(pattern)
    )
}

fn tag_reference_query(tag: &QualifiedName) -> String {
    let database = quote_literal(&tag.database().resolved());
    let schema = quote_literal(&tag.schema().resolved());
    format!(
        "SELECT OBJECT_NAME, TAG_VALUE FROM SNOWFLAKE.ACCOUNT_USAGE.TAG_REFERENCES \
         WHERE TAG_DATABASE = {database} AND TAG_SCHEMA = {schema} AND TAG_NAME = {} \
         AND OBJECT_DATABASE = {database} AND OBJECT_SCHEMA = {schema} \
         AND OBJECT_DELETED IS NULL ORDER BY OBJECT_NAME",
        quote_literal(&tag.name().resolved())
    )
}

/// Extracts the single allowed value from a `SHOW TAGS` `allowed_values` cell.
///
/// The cell holds a JSON array such as `["CUSTOMER_ID,REGION"]`.
fn parse_allowed_value(cell: &str) -> Option<String> {
    let values: Vec<String> = serde_json::from_str(cell).ok()?;
    values.into_iter().next()
}

fn is_named(row: &Row<'_>, stored: &str) -> bool {
    row.get("name") == Some(stored)
}

fn tag_from_row(row: Row<'_>) -> Option<TagDefinition> {
    Some(TagDefinition {
        name: row.get("name")?.to_string(),
        allowed_value: row.get("allowed_values").and_then(parse_allowed_value),
        comment: row
            .get("comment")
            .filter(|c| !c.is_empty())
            .map(str::to_string),
    })
}

// ============================================================================
// Warehouse capabilities
// ============================================================================

#[async_trait]
impl Warehouse for SqlApiClient {
    async fn describe(&self, name: &QualifiedName) -> Result<ObservedState> {
        let stored = name.name().resolved();

        let tables = self
            .query(&show_like("DYNAMIC TABLES", &stored, &name.schema_sql()))
            .await?;
        if let Some(row) = tables.rows().find(|row| is_named(row, &stored)) {
            return Ok(ObservedState::ManagedTable {
                target_lag: row.get("target_lag").map(str::to_string),
                warehouse: row.get("warehouse").map(str::to_string),
            });
        }

        let views = self
            .query(&show_like("VIEWS", &stored, &name.schema_sql()))
            .await?;
        if views.rows().any(|row| is_named(&row, &stored)) {
            return Ok(ObservedState::StaticView);
        }

        Ok(ObservedState::Absent)
    }

    async fn execute(&self, statement: &Statement) -> Result<()> {
        self.query(&statement.to_sql()).await.map(|_| ())
    }
}

#[async_trait]
impl EntityTagStore for SqlApiClient {
    async fn get_tag(&self, name: &QualifiedName) -> Result<Option<TagDefinition>> {
        let stored = name.name().resolved();
        let tags = self
            .query(&show_like("TAGS", &stored, &name.schema_sql()))
            .await?;
        Ok(tags
            .rows()
            .filter(|row| is_named(row, &stored))
            .find_map(tag_from_row))
    }

    async fn list_tags(
        &self,
        database: &Identifier,
        schema: &Identifier,
        prefix: &str,
    ) -> Result<Vec<TagDefinition>> {
        let schema_sql = format!("{}.{}", database.to_sql(), schema.to_sql());
        let tags = self
            .query(&show_like("TAGS", &format!("{prefix}%"), &schema_sql))
            .await?;
        Ok(tags
            .rows()
            .filter(|row| row.get("name").is_some_and(|n| n.starts_with(prefix)))
            .filter_map(tag_from_row)
            .collect())
    }
}

#[async_trait]
impl TagReferenceStore for SqlApiClient {
    async fn tag_references(&self, tag: &QualifiedName) -> Result<Vec<TagReference>> {
        let rows = self.query(&tag_reference_query(tag)).await?;

        let mut references = Vec::with_capacity(rows.len());
        for row in rows.rows() {
            let (Some(object), Some(value)) = (row.get("OBJECT_NAME"), row.get("TAG_VALUE"))
            else {
                continue;
            };
            // Account usage lags behind DDL, so confirm the object still exists
            // and learn its domain.
            let name = QualifiedName::new(
                tag.database().clone(),
                tag.schema().clone(),
                Identifier::from_stored(object)?,
            );
            let domain = match self.describe(&name).await? {
                ObservedState::Absent => continue,
                ObservedState::StaticView => ObjectDomain::View,
                ObservedState::ManagedTable { .. } => ObjectDomain::DynamicTable,
            };
            references.push(TagReference {
                object: object.to_string(),
                domain,
                value: value.to_string(),
            });
        }
        Ok(references)
    }
}
