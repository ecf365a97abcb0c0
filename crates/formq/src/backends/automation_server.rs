//! 📡 Automation Server queue — the workqueue that lives behind an HTTP API and a bearer token.
//!
//! 🎬 COLD OPEN — INT. AUTOMATION SERVER — THE ITEMS ENDPOINT
//!
//! `GET {url}/workqueues/{id}/items` returns `{"items": [{"reference": ...}, ...]}`.
//! `POST {url}/workqueues/{id}/add` takes `{"reference": ..., "data": ...}`.
//! That's the whole API surface we care about. Two endpoints. One token. Zero retries here,
//! because retries belong to the enqueuer. 🦆
//!
//! 🧠 Knowledge graph:
//! - `url`/`token` come from config, falling back to `ATS_URL`/`ATS_TOKEN`
//! - missing or empty ⇒ `PipelineError::Configuration`, raised in `new`, before any request
//! - every other failure (connect, status, body) ⇒ `PipelineError::Transport`

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::backends::WorkQueue;
use crate::errors::PipelineError;

const URL_ENV: &str = "ATS_URL";
const TOKEN_ENV: &str = "ATS_TOKEN";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AutomationServerConfig {
    /// 📡 Base URL. Absent ⇒ `ATS_URL`.
    #[serde(default)]
    pub url: Option<String>,
    /// 🔒 Bearer token. Absent ⇒ `ATS_TOKEN`.
    #[serde(default)]
    pub token: Option<String>,
    pub workqueue_id: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Option<Vec<Value>>,
}

pub(crate) struct AutomationServerQueue {
    client: reqwest::Client,
    base_url: String,
    token: String,
    workqueue_id: u64,
}

// 🔒 hand-written so the token never lands in a log line
impl std::fmt::Debug for AutomationServerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationServerQueue")
            .field("base_url", &self.base_url)
            .field("workqueue_id", &self.workqueue_id)
            .finish()
    }
}

/// 🔧 Configured value if present, else the environment. Empty counts as missing.
fn resolve_setting(configured: Option<&str>, env_var: &str) -> Option<String> {
    let value = match configured {
        Some(value) => value.to_string(),
        None => std::env::var(env_var).ok()?,
    };
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

impl AutomationServerQueue {
    /// 🚀 Resolve connection settings and build the HTTP client. No request is sent.
    pub(crate) fn new(config: &AutomationServerConfig) -> Result<Self, PipelineError> {
        let (Some(base_url), Some(token)) = (
            resolve_setting(config.url.as_deref(), URL_ENV),
            resolve_setting(config.token.as_deref(), TOKEN_ENV),
        ) else {
            return Err(PipelineError::Configuration(format!(
                "{URL_ENV} or {TOKEN_ENV} is not set (and no url/token in queue_config)"
            )));
        };

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| PipelineError::transport("build the HTTP client", err))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            workqueue_id: config.workqueue_id,
        })
    }

    fn endpoint(&self, tail: &str) -> String {
        format!("{}/workqueues/{}/{tail}", self.base_url, self.workqueue_id)
    }

    async fn expect_success(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response, PipelineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PipelineError::transport(
            operation,
            format!("server answered {status}: {body}"),
        ))
    }
}

#[async_trait]
impl WorkQueue for AutomationServerQueue {
    async fn add_item(&self, reference: &str, payload: &Value) -> Result<(), PipelineError> {
        let operation = format!("add item {reference} to workqueue {}", self.workqueue_id);
        let response = self
            .client
            .post(self.endpoint("add"))
            .bearer_auth(&self.token)
            .json(&json!({"reference": reference, "data": payload}))
            .send()
            .await
            .map_err(|err| PipelineError::transport(&operation, err))?;
        Self::expect_success(response, &operation).await?;
        trace!(reference, "📡 workqueue accepted the item");
        Ok(())
    }

    async fn list_references(&self) -> Result<HashSet<String>, PipelineError> {
        let operation = format!("list items in workqueue {}", self.workqueue_id);
        let response = self
            .client
            .get(self.endpoint("items"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| PipelineError::transport(&operation, err))?;
        let response = Self::expect_success(response, &operation).await?;
        let page: ItemsPage = response
            .json()
            .await
            .map_err(|err| PipelineError::transport(&operation, err))?;

        let references: HashSet<String> = page
            .items
            .unwrap_or_default()
            .iter()
            .filter_map(|item| item.get("reference").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        debug!(
            workqueue_id = self.workqueue_id,
            count = references.len(),
            "📋 existing references fetched"
        );
        Ok(references)
    }
}
