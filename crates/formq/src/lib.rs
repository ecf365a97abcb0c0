//! 📬 formq — weekly form submissions in, one tidy work item per week out.
//!
//! 🎬 COLD OPEN — INT. FORMS PLATFORM — SUNDAY, 23:58
//!
//! Someone hits "submit". On Monday, this crate wakes up, finds every submission completed
//! last week, cleans up whatever the form frontend did to the answers, and drops the whole
//! week into a work queue as one item. Later, something dequeues it and writes the export.
//! Two entry points, one for each half: [`populate`] and [`process`]. 🦆
//!
//! ## Knowledge Graph 🧠
//! - `app_config` → figment-loaded [`AppConfig`]
//! - `backends` → source / queue / store traits and their implementations
//! - `transforms` → value normalizer, literal parser, datetime extractor, submission transform
//! - `window` → last week's Monday..Sunday
//! - `sequencer` → deterministic order for the enqueuer
//! - `supervisors` → one run, start to finish, plus the bounded enqueuer
//! - `exporter` → the process step

use anyhow::Result;
use chrono::NaiveDate;

pub mod app_config;
pub(crate) mod backends;
pub mod common;
pub mod errors;
pub mod exporter;
pub(crate) mod sequencer;
pub(crate) mod supervisors;
pub(crate) mod transforms;
pub mod window;

pub use app_config::AppConfig;
pub use backends::{AutomationServerConfig, FileSourceConfig, LocalDirConfig};
pub use common::{FieldMapping, NormalizedRecord, RawSubmission, WorkItem};
pub use errors::PipelineError;
pub use exporter::{ExportOutcome, ExportTable};
pub use supervisors::{EnqueueSummary, FormRun, RunOutcome};
pub use window::Window;

use crate::supervisors::Supervisor;

/// 🚀 One ingestion run: fetch, filter, transform, dedup, enqueue.
pub async fn populate(app_config: AppConfig, today: NaiveDate) -> Result<RunOutcome> {
    Supervisor::new(app_config).populate(today).await
}

/// 📤 The export step for one dequeued work item.
pub async fn process(app_config: AppConfig, item: &WorkItem) -> Result<ExportOutcome> {
    Supervisor::new(app_config).process(item).await
}
