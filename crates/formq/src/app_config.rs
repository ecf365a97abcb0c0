//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - `source_config` / `queue_config` / `store_config` are externally tagged enums:
//!   `[queue_config.AutomationServer]` in TOML, `queue_config = "InMemory"` for the RAM ones
//! - `runtime` carries the enqueue knobs, all defaulted
//! - `form` is the per-form configuration: identity, export target, field mapping
//! - env vars: `FORMQ_` prefix, `__` for nesting (`FORMQ_RUNTIME__MAX_RETRIES=3`)

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::{AutomationServerConfig, FileSourceConfig, LocalDirConfig};
use crate::common::FieldMapping;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 🚰 Where submissions come from.
    pub source_config: SourceConfig,
    /// 📬 Where work items go.
    pub queue_config: QueueConfig,
    /// 🗄️ Where exports land. Only the `process` step needs it.
    #[serde(default)]
    pub store_config: StoreConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    pub form: FormConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    File(FileSourceConfig),
    InMemory,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub enum QueueConfig {
    AutomationServer(AutomationServerConfig),
    InMemory,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub enum StoreConfig {
    LocalDir(LocalDirConfig),
    #[default]
    InMemory,
}

/// 🎛️ The enqueue knobs. Defaults match what production has always run with.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// 🚦 How many inserts may be in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// 🔄 Total attempts per item, first try included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// ⏱️ Backoff base; attempt `n` waits `base * 2^(n-1)` before attempt `n + 1`.
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: f64,
}

fn default_max_concurrency() -> usize {
    10
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_base_delay_secs() -> f64 {
    0.5
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            retry_base_delay_secs: default_retry_base_delay_secs(),
        }
    }
}

/// 📝 Everything about the one form this run is for. Immutable for the run.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FormConfig {
    /// 🏷️ The forms platform's id for this form; also the reference prefix.
    pub form_type_id: String,
    /// 📄 Export file name; `monday_last_week` / `sunday_last_week` get replaced per run.
    pub file_name_template: String,
    pub folder_name: String,
    pub site_name: String,
    #[serde(default)]
    pub field_mapping: FieldMapping,
}

/// 🚀 Load the config from `FORMQ_*` env vars and, if given, a TOML file. TOML wins.
///
/// 📐 No file ⇒ env vars only. We never go hunting for a default file name.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("FORMQ_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (FORMQ_*). \
             The file exists in our hearts, but apparently not on disk. Or it's missing a section.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (FORMQ_*). \
                 No file was provided. This one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}
