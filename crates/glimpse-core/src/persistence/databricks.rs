//! Databricks SQL warehouse backend.
//!
//! Talks to the SQL Statement Execution API (`/api/2.0/sql/statements`).
//! A connection owns its own HTTP client, so nothing is pooled across
//! persist calls. Statements are staged by `execute` and only submitted on
//! `commit`; `rollback` drops whatever is still staged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SqlValue, Statement, Warehouse, WarehouseConnection};
use crate::config::WarehouseConfig;
use crate::error::PersistError;
use crate::llm::resolve_env_var;

/// Connector for a Databricks SQL warehouse.
///
/// Credentials are resolved on every connect so a missing variable turns
/// into a failed persist instead of a failed startup.
#[derive(Debug, Clone)]
pub struct DatabricksWarehouse {
    config: WarehouseConfig,
}

impl DatabricksWarehouse {
    pub fn new(config: &WarehouseConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn resolve(value: &str, what: &str) -> Result<String, PersistError> {
        resolve_env_var(value)
            .ok_or_else(|| PersistError::Connection(format!("Databricks {what} not set ({value})")))
    }

    /// `https://<host>` with no trailing slash; a scheme in the config is kept.
    fn base_url(host: &str) -> String {
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }
}

#[async_trait]
impl Warehouse for DatabricksWarehouse {
    async fn connect(&self) -> Result<Box<dyn WarehouseConnection>, PersistError> {
        let host = Self::resolve(&self.config.host, "host")?;
        let warehouse_id = Self::resolve(&self.config.warehouse_id, "warehouse id")?;
        let token = Self::resolve(&self.config.token, "token")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.wait_timeout_secs + 10))
            .build()
            .map_err(|e| PersistError::Connection(format!("Failed to build HTTP client: {e}")))?;

        tracing::debug!(%host, %warehouse_id, "Opened Databricks SQL connection");
        Ok(Box::new(DatabricksConnection {
            client: Some(client),
            statements_url: format!("{}/api/2.0/sql/statements", Self::base_url(&host)),
            warehouse_id,
            token,
            wait_timeout: format!("{}s", self.config.wait_timeout_secs),
            staged: Vec::new(),
        }))
    }
}

struct DatabricksConnection {
    client: Option<reqwest::Client>,
    statements_url: String,
    warehouse_id: String,
    token: String,
    wait_timeout: String,
    staged: Vec<Statement>,
}

// --- Request types ---

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    warehouse_id: &'a str,
    statement: &'a str,
    parameters: Vec<Parameter>,
    wait_timeout: &'a str,
    on_wait_timeout: &'static str,
}

#[derive(Serialize)]
struct Parameter {
    name: String,
    value: String,
    #[serde(rename = "type")]
    param_type: &'static str,
}

impl From<(String, SqlValue)> for Parameter {
    fn from((name, value): (String, SqlValue)) -> Self {
        match value {
            SqlValue::String(value) => Self {
                name,
                value,
                param_type: "STRING",
            },
            SqlValue::Int(value) => Self {
                name,
                value: value.to_string(),
                param_type: "BIGINT",
            },
        }
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct ExecuteResponse {
    statement_id: Option<String>,
    status: StatementStatus,
}

#[derive(Deserialize)]
struct StatementStatus {
    state: String,
    error: Option<ServiceError>,
}

#[derive(Deserialize)]
struct ServiceError {
    error_code: Option<String>,
    message: Option<String>,
}

impl DatabricksConnection {
    async fn submit(
        &self,
        client: &reqwest::Client,
        statement: Statement,
    ) -> Result<(), PersistError> {
        let body = ExecuteRequest {
            warehouse_id: &self.warehouse_id,
            statement: &statement.sql,
            parameters: statement.params.into_iter().map(Parameter::from).collect(),
            wait_timeout: &self.wait_timeout,
            on_wait_timeout: "CANCEL",
        };

        let resp = client
            .post(&self.statements_url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PersistError::Commit(format!("Statement request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PersistError::Commit(format!("Databricks HTTP {status}: {text}")));
        }

        let result: ExecuteResponse = resp
            .json()
            .await
            .map_err(|e| PersistError::Commit(format!("Failed to parse statement response: {e}")))?;

        if result.status.state == "SUCCEEDED" {
            tracing::debug!(statement_id = ?result.statement_id, "Statement succeeded");
            return Ok(());
        }

        let detail = result
            .status
            .error
            .map(|e| {
                format!(
                    "{}: {}",
                    e.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
                    e.message.unwrap_or_default()
                )
            })
            .unwrap_or_else(|| "no error detail".to_string());
        Err(PersistError::Commit(format!(
            "Statement {} ended in state {} ({detail})",
            result.statement_id.as_deref().unwrap_or("?"),
            result.status.state
        )))
    }
}

#[async_trait]
impl WarehouseConnection for DatabricksConnection {
    async fn execute(&mut self, statement: Statement) -> Result<(), PersistError> {
        if self.client.is_none() {
            return Err(PersistError::Write("connection is closed".into()));
        }
        self.staged.push(statement);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), PersistError> {
        let client = self
            .client
            .clone()
            .ok_or_else(|| PersistError::Commit("connection is closed".into()))?;
        let staged = std::mem::take(&mut self.staged);
        for statement in staged {
            self.submit(&client, statement).await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), PersistError> {
        self.staged.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PersistError> {
        self.staged.clear();
        self.client = None;
        Ok(())
    }
}
