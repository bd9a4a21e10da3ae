//! Persistence gateway for the analysis log table.
//!
//! [`LogStore`] appends one row per analyzed request to a SQL warehouse. It
//! never returns an error: every failure (JSON encoding, connect, write,
//! commit) is folded into a [`PersistOutcome`]. Each call opens its own
//! connection, makes at most one write attempt, rolls back on failure and
//! closes the connection on every path.

mod databricks;

pub use databricks::DatabricksWarehouse;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PersistError;
use crate::types::{AnalysisRecord, FinishReason, RequestContext};

/// Scalar bound to a named statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    String(String),
    Int(i64),
}

/// A SQL statement with `:name` parameter markers and their values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<(String, SqlValue)>,
}

/// Connector that hands out fresh, unpooled connections.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn WarehouseConnection>, PersistError>;
}

/// One open warehouse connection.
///
/// Writes become durable only on [`commit`](WarehouseConnection::commit).
#[async_trait]
pub trait WarehouseConnection: Send {
    async fn execute(&mut self, statement: Statement) -> Result<(), PersistError>;

    async fn commit(&mut self) -> Result<(), PersistError>;

    async fn rollback(&mut self) -> Result<(), PersistError>;

    /// Release the connection. Safe to call more than once.
    async fn close(&mut self) -> Result<(), PersistError>;
}

/// Everything about the request that is logged next to the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistContext {
    pub bytes_len: usize,
    /// Base64 image exactly as received
    pub image_data: String,
    pub custom_metadata: Map<String, Value>,
    pub company_id: String,
    pub machine_id: String,
    pub camera_ids: Vec<String>,
    pub request: RequestContext,
}

/// Whether a persist call wrote its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistStatus {
    Success,
    Error,
}

/// Structured result of a persist call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistOutcome {
    pub status: PersistStatus,
    pub message: String,
}

impl PersistOutcome {
    fn success() -> Self {
        Self {
            status: PersistStatus::Success,
            message: "Analysis result inserted successfully".to_string(),
        }
    }

    fn failed(error: &PersistError) -> Self {
        let message = match error {
            PersistError::Serialization(e) => format!("Failed to encode metadata to JSON: {e}"),
            other => format!("Failed to insert analysis result: {other}"),
        };
        Self {
            status: PersistStatus::Error,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PersistStatus::Success
    }
}

/// Model bookkeeping stored next to the content in the `llm_response` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMetadata {
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub finish_reason: FinishReason,
}

/// The `llm_response` column: `{"content": ..., "metadata": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedLlmJson {
    pub content: String,
    pub metadata: LlmMetadata,
}

impl From<&AnalysisRecord> for CombinedLlmJson {
    fn from(record: &AnalysisRecord) -> Self {
        Self {
            content: record.content.clone(),
            metadata: LlmMetadata {
                model: record.model.clone(),
                prompt_tokens: record.prompt_tokens,
                completion_tokens: record.completion_tokens,
                total_tokens: record.total_tokens,
                finish_reason: record.finish_reason.clone(),
            },
        }
    }
}

impl CombinedLlmJson {
    pub fn into_record(self) -> AnalysisRecord {
        AnalysisRecord {
            content: self.content,
            model: self.metadata.model,
            prompt_tokens: self.metadata.prompt_tokens,
            completion_tokens: self.metadata.completion_tokens,
            total_tokens: self.metadata.total_tokens,
            finish_reason: self.metadata.finish_reason,
        }
    }
}

/// One row of the analysis log table, with every column ready to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub llm_response: String,
    pub bytes_len: i64,
    pub image_data: String,
    pub custom_metadata: String,
    pub company_id: String,
    pub machine_id: String,
    pub camera_id: String,
    pub headers: String,
    pub client_ip: String,
}

impl LogRow {
    pub fn build(record: &AnalysisRecord, context: &PersistContext) -> Result<Self, PersistError> {
        Ok(Self {
            llm_response: serde_json::to_string(&CombinedLlmJson::from(record))?,
            bytes_len: i64::try_from(context.bytes_len).unwrap_or(i64::MAX),
            image_data: context.image_data.clone(),
            custom_metadata: serde_json::to_string(&context.custom_metadata)?,
            company_id: context.company_id.clone(),
            machine_id: context.machine_id.clone(),
            camera_id: context.camera_ids.join(","),
            headers: context.request.headers_json()?,
            client_ip: context.request.client_ip.clone(),
        })
    }

    /// Parameterized INSERT into `table`; `created_timestamp` is set by the warehouse.
    pub fn insert_statement(self, table: &str) -> Statement {
        let sql = format!(
            "INSERT INTO {table} \
             (llm_response, bytes_len, image_data, custom_metadata, company_id, machine_id, \
             camera_id, headers, client_ip, created_timestamp) \
             VALUES (:llm_response, :bytes_len, :image_data, :custom_metadata, :company_id, \
             :machine_id, :camera_id, :headers, :client_ip, CURRENT_TIMESTAMP)"
        );
        let params = vec![
            ("llm_response", SqlValue::String(self.llm_response)),
            ("bytes_len", SqlValue::Int(self.bytes_len)),
            ("image_data", SqlValue::String(self.image_data)),
            ("custom_metadata", SqlValue::String(self.custom_metadata)),
            ("company_id", SqlValue::String(self.company_id)),
            ("machine_id", SqlValue::String(self.machine_id)),
            ("camera_id", SqlValue::String(self.camera_id)),
            ("headers", SqlValue::String(self.headers)),
            ("client_ip", SqlValue::String(self.client_ip)),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
        Statement { sql, params }
    }
}

/// Where the orchestrator sends finished analyses.
#[async_trait]
pub trait AnalysisSink: Send + Sync {
    /// Record one analysis. Never fails; the outcome says what happened.
    async fn persist(&self, record: &AnalysisRecord, context: &PersistContext) -> PersistOutcome;
}

/// Persistence gateway writing to a warehouse table.
pub struct LogStore<W> {
    warehouse: W,
    table: String,
}

impl<W: Warehouse> LogStore<W> {
    pub fn new(warehouse: W, table: &str) -> Self {
        Self {
            warehouse,
            table: table.to_string(),
        }
    }

    async fn write(
        &self,
        conn: &mut dyn WarehouseConnection,
        record: &AnalysisRecord,
        context: &PersistContext,
    ) -> Result<(), PersistError> {
        let row = LogRow::build(record, context)?;
        conn.execute(row.insert_statement(&self.table)).await?;
        conn.commit().await
    }
}

#[async_trait]
impl<W: Warehouse> AnalysisSink for LogStore<W> {
    async fn persist(&self, record: &AnalysisRecord, context: &PersistContext) -> PersistOutcome {
        let mut conn = match self.warehouse.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "Warehouse connection failed");
                return PersistOutcome::failed(&e);
            }
        };

        let result = self.write(conn.as_mut(), record, context).await;

        if let Err(e) = &result {
            tracing::error!(error = %e, table = %self.table, "Analysis log insert failed");
            if let Err(rollback_err) = conn.rollback().await {
                tracing::debug!(error = %rollback_err, "Rollback after failed insert also failed");
            }
        }
        if let Err(close_err) = conn.close().await {
            tracing::debug!(error = %close_err, "Closing warehouse connection failed");
        }

        match result {
            Ok(()) => PersistOutcome::success(),
            Err(e) => PersistOutcome::failed(&e),
        }
    }
}
