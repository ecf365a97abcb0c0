//! 🎬 *[camera pans across a municipal file share at dawn]*
//! 🎬 *[dramatic orchestral music swells]*
//! 🎬 "In a world where forms pile up every week..."
//! 🎬 "One supervisor dared to queue them all."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor module — part middle manager, part helicopter parent. It wires the
//! backends to the transforms for exactly one run and reports how it went.
//!
//! 🧠 Knowledge graph (one `populate` run):
//! 1. `FormRun::resolve` → window, reference, export target (file name tokens resolved)
//! 2. source `fetch_all` → fatal on error
//! 3. window filter → transform each (serial from `entity.serial`, missing ⇒ "" + warn)
//! 4. one `WorkItem`, even for an empty week
//! 5. `list_references` → already there ⇒ `RunOutcome::AlreadyQueued`, nothing enqueued
//! 6. `enqueuer::enqueue_all` → `RunOutcome::Enqueued`
//!
//! ⚠️ The enqueuer is the supervisor's private little minion. It does not get a pub.

mod enqueuer;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::app_config::{AppConfig, FormConfig};
use crate::backends::{
    QueueBackend, SourceBackend, StoreBackend, SubmissionSource, WorkQueue,
};
use crate::common::{ExportTarget, FieldMapping, WorkItem, WorkItemData};
use crate::exporter::{self, ExportOutcome};
use crate::transforms;
use crate::window::Window;

pub use enqueuer::EnqueueSummary;
pub(crate) use enqueuer::EnqueueSettings;

/// 📅 Everything one run derives from the form config and today's date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRun {
    pub today: NaiveDate,
    pub window: Window,
    /// 🔑 `{form_type_id}_{today}`, the queue's dedup key.
    pub reference: String,
    pub target: ExportTarget,
}

impl FormRun {
    pub fn resolve(form: &FormConfig, today: NaiveDate) -> Self {
        let window = Window::select(today);
        Self {
            today,
            window,
            reference: format!("{}_{}", form.form_type_id, today.format("%Y-%m-%d")),
            target: ExportTarget {
                form_type_id: form.form_type_id.clone(),
                site_name: form.site_name.clone(),
                folder_name: form.folder_name.clone(),
                file_name: window.resolve_template(&form.file_name_template),
            },
        }
    }
}

/// 🏁 How a `populate` run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// 📎 The reference was already in the queue. Nothing was sent.
    AlreadyQueued { reference: String },
    Enqueued {
        reference: String,
        window: Window,
        submissions: usize,
        summary: EnqueueSummary,
    },
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::AlreadyQueued { reference } => {
                write!(f, "Work item {reference} already queued")
            }
            RunOutcome::Enqueued {
                window,
                submissions,
                summary,
                ..
            } => write!(
                f,
                "Queued {submissions} submission(s) for {window}: {} succeeded, {} failed",
                summary.succeeded, summary.failed
            ),
        }
    }
}

/// 📦 The Supervisor: holds the config, builds the backends, runs the steps.
pub(crate) struct Supervisor {
    app_config: AppConfig,
}

impl Supervisor {
    pub(crate) fn new(app_config: AppConfig) -> Self {
        Self { app_config }
    }

    /// 🚀 One ingestion run for `today`.
    pub(crate) async fn populate(&self, today: NaiveDate) -> Result<RunOutcome> {
        let form = &self.app_config.form;
        let run = FormRun::resolve(form, today);
        let mut source = SourceBackend::from_config(&self.app_config.source_config);
        let queue = QueueBackend::from_config(&self.app_config.queue_config)
            .context("💀 The work queue could not be set up. Check queue_config, ATS_URL and ATS_TOKEN.")?;
        let settings = EnqueueSettings::from_runtime(&self.app_config.runtime);

        populate_with(&mut source, Arc::new(queue), &run, &form.field_mapping, settings).await
    }

    /// 📤 The export step for one dequeued item.
    pub(crate) async fn process(&self, item: &WorkItem) -> Result<ExportOutcome> {
        let store = StoreBackend::from_config(&self.app_config.store_config);
        info!(reference = %item.reference, "📬 Processing work item");
        exporter::process_item(&item.data, &self.app_config.form.field_mapping, &store).await
    }
}

/// 🔧 The run itself, with the backends handed in.
pub(crate) async fn populate_with<S, Q>(
    source: &mut S,
    queue: Arc<Q>,
    run: &FormRun,
    mapping: &FieldMapping,
    settings: EnqueueSettings,
) -> Result<RunOutcome>
where
    S: SubmissionSource + ?Sized,
    Q: WorkQueue + ?Sized + 'static,
{
    info!(window = %run.window, reference = %run.reference, "📡 STEP 1 - Fetching all active submissions");
    let all_submissions = source
        .fetch_all(&run.target.form_type_id)
        .await
        .context("💀 Could not retrieve submissions. Without them there is no week to report on.")?;
    info!(total = all_submissions.len(), "📡 Submissions retrieved");

    info!("📅 STEP 2 - Looking for last week's submissions");
    let submissions: Vec<_> = all_submissions
        .iter()
        .filter(|submission| run.window.includes(submission))
        .map(|submission| {
            let serial = submission.serial().unwrap_or_else(|| {
                warn!("🔢 submission has no serial number, using an empty one");
                String::new()
            });
            transforms::transform(&serial, submission, mapping)
        })
        .collect();
    info!(in_window = submissions.len(), "📅 Submissions in the previous week");

    let item = WorkItem {
        reference: run.reference.clone(),
        data: WorkItemData {
            config: run.target.clone(),
            submissions,
        },
    };
    let submission_count = item.data.submissions.len();

    let existing = queue
        .list_references()
        .await
        .context("💀 Could not list the references already in the work queue")?;
    if existing.contains(&run.reference) {
        info!(reference = %run.reference, "📎 Work item already queued, skipping");
        return Ok(RunOutcome::AlreadyQueued {
            reference: run.reference.clone(),
        });
    }

    let summary = enqueuer::enqueue_all(queue, vec![item], settings).await;
    Ok(RunOutcome::Enqueued {
        reference: run.reference.clone(),
        window: run.window,
        submissions: submission_count,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::in_mem::InMemoryQueue;
    use crate::backends::in_mem::InMemorySource;
    use crate::common::MappingEntry;
    use crate::errors::PipelineError;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn form() -> FormConfig {
        FormConfig {
            form_type_id: "tilmelding".to_string(),
            file_name_template: "Dataudtræk - monday_last_week til sunday_last_week.xlsx"
                .to_string(),
            folder_name: "General".to_string(),
            site_name: "Teams-Site".to_string(),
            field_mapping: FieldMapping::new(vec![
                MappingEntry::flat("elevens_navn", "Elevens navn"),
                MappingEntry::flat("oensket_sprog", "Ønsket sprog"),
            ]),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 18).expect("💀 valid date")
    }

    fn row(serial: u32, completed: &str) -> Value {
        json!({
            "form_type": "tilmelding",
            "form_data": json!({
                "entity": {
                    "serial": [{"value": serial.to_string()}],
                    "created": [{"value": "2025-05-01T08:00:00+02:00"}],
                    "completed": [{"value": completed}]
                },
                "data": {"elevens_navn": format!("Elev {serial}"), "oensket_sprog": "['Dari']"}
            })
            .to_string()
        })
    }

    fn five_rows_two_in_window() -> Vec<Value> {
        vec![
            row(1, "2025-05-30T10:00:00+02:00"),
            row(2, "2025-06-02T00:00:01+02:00"),
            row(3, "2025-06-08T23:59:59+02:00"),
            row(4, "2025-06-09T00:00:00+02:00"),
            row(5, ""),
        ]
    }

    fn settings() -> EnqueueSettings {
        EnqueueSettings::new(10, 1, Duration::from_millis(500))
    }

    #[test]
    fn the_one_where_the_run_knows_its_reference_and_file_name() {
        let run = FormRun::resolve(&form(), today());
        assert_eq!(run.reference, "tilmelding_2025-06-18");
        assert_eq!(
            run.target.file_name,
            "Dataudtræk - 2025-06-02 til 2025-06-08.xlsx"
        );
        assert_eq!(run.target.form_type_id, "tilmelding");
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_five_submissions_become_one_item_with_two() -> Result<()> {
        let mut source = InMemorySource::new(five_rows_two_in_window());
        let queue = InMemoryQueue::default();
        let run = FormRun::resolve(&form(), today());

        let outcome = populate_with(
            &mut source,
            Arc::new(queue.clone()),
            &run,
            &form().field_mapping,
            settings(),
        )
        .await?;

        assert_eq!(
            outcome.to_string(),
            "Queued 2 submission(s) for 2025-06-02..2025-06-08: 1 succeeded, 0 failed"
        );
        let items = queue.items().await;
        assert_eq!(items.len(), 1);
        let (reference, payload) = &items[0];
        assert_eq!(reference, "tilmelding_2025-06-18");

        let item = WorkItem::decode(&payload.to_string())?;
        assert_eq!(item.data.submissions.len(), 2);
        assert_eq!(item.data.config, run.target);
        let serials: Vec<&Value> = item
            .data
            .submissions
            .iter()
            .map(|s| &s["Serial number"])
            .collect();
        assert_eq!(serials, vec![&json!("2"), &json!("3")]);
        assert_eq!(item.data.submissions[0]["Ønsket sprog"], json!("Dari"));
        assert_eq!(item.data.submissions[0]["Oprettet"], json!("2025-05-01 08:00:00"));
        // 🔒 the mapping stays home; only the resolved target travels
        assert!(payload["item"]["data"]["config"].get("field_mapping").is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_an_already_queued_week_is_left_alone() -> Result<()> {
        let mut source = InMemorySource::new(five_rows_two_in_window());
        let queue = InMemoryQueue::default()
            .with_references(["tilmelding_2025-06-18"])
            .await;
        let run = FormRun::resolve(&form(), today());

        let outcome = populate_with(
            &mut source,
            Arc::new(queue.clone()),
            &run,
            &form().field_mapping,
            settings(),
        )
        .await?;

        assert_eq!(outcome.to_string(), "Work item tilmelding_2025-06-18 already queued");
        assert!(queue.attempts().await.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_quiet_week_still_sends_an_empty_item() -> Result<()> {
        let mut source = InMemorySource::new(vec![row(1, "2025-01-01T10:00:00")]);
        let queue = InMemoryQueue::default();
        let run = FormRun::resolve(&form(), today());

        let outcome = populate_with(
            &mut source,
            Arc::new(queue.clone()),
            &run,
            &form().field_mapping,
            settings(),
        )
        .await?;

        assert!(matches!(
            outcome,
            RunOutcome::Enqueued { submissions: 0, summary: EnqueueSummary { succeeded: 1, failed: 0 }, .. }
        ));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_failed_lookup_stops_the_run() {
        let mut source = InMemorySource::new(five_rows_two_in_window());
        let queue = InMemoryQueue::default().listing_fails().await;
        let run = FormRun::resolve(&form(), today());

        let err = populate_with(
            &mut source,
            Arc::new(queue.clone()),
            &run,
            &form().field_mapping,
            settings(),
        )
        .await
        .expect_err("💀 a broken lookup must not turn into a blind enqueue");

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Transport { .. })
        ));
        assert!(queue.attempts().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_failed_insert_is_counted_not_thrown() -> Result<()> {
        let mut source = InMemorySource::new(five_rows_two_in_window());
        let queue = InMemoryQueue::default().always_failing().await;
        let run = FormRun::resolve(&form(), today());

        let outcome = populate_with(
            &mut source,
            Arc::new(queue.clone()),
            &run,
            &form().field_mapping,
            EnqueueSettings::new(10, 2, Duration::from_millis(500)),
        )
        .await?;

        assert_eq!(
            outcome.to_string(),
            "Queued 2 submission(s) for 2025-06-02..2025-06-08: 0 succeeded, 1 failed"
        );
        assert_eq!(queue.attempts().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_supervisor_wires_in_memory_backends_from_config() -> Result<()> {
        let app_config = AppConfig {
            source_config: crate::app_config::SourceConfig::InMemory,
            queue_config: crate::app_config::QueueConfig::InMemory,
            store_config: crate::app_config::StoreConfig::InMemory,
            runtime: crate::app_config::RuntimeConfig::default(),
            form: form(),
        };
        let supervisor = Supervisor::new(app_config);

        let outcome = supervisor.populate(today()).await?;
        assert!(matches!(outcome, RunOutcome::Enqueued { submissions: 0, .. }));

        let empty = WorkItem {
            reference: "r".to_string(),
            data: WorkItemData {
                config: FormRun::resolve(&form(), today()).target,
                submissions: vec![],
            },
        };
        assert_eq!(supervisor.process(&empty).await?, ExportOutcome::NoSubmissions);
        Ok(())
    }
}
