//! 🚀 formq-cli — the front door, the bouncer, the maitre d' of formq.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that parses args, loads config,
//! sets up logging, and then lets the real code do the heavy lifting.
//! Like a manager. 🦆

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use tracing::error;
use tracing_subscriber::EnvFilter;

use formq::{RunOutcome, WorkItem};

/// 📬 Weekly form submissions in, one work item per week out.
#[derive(Debug, Parser)]
#[command(name = "formq", version, about)]
struct Cli {
    /// 🔧 TOML config file. Without it, only FORMQ_* environment variables are read.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 📡 Fetch last week's submissions and enqueue them as one work item.
    Populate {
        /// 📅 Pretend today is this date (YYYY-MM-DD). Defaults to the local date.
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// 📤 Export one work item (JSON file, bare or `{"item": ...}`) to the document store.
    Process { item: PathBuf },
}

#[tokio::main]
async fn main() {
    // 📡 Set up tracing, because println! debugging is a lifestyle choice
    // we're trying to move past, like flip phones and cargo shorts
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like the work queue isn't reachable. \
                Double-check ATS_URL (or queue_config.AutomationServer.url) and that the \
                Automation Server is actually up. Even servers need a nudge sometimes. ☕"
            );
        }

        // 🗑️ Exit with prejudice. Process exitus maximus.
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // 🔒 Validate the config file exists before we get too emotionally attached
    let config_file = match cli.config.as_deref() {
        Some(path) => Some(validated(path)?),
        None => None,
    };
    let app_config = formq::app_config::load_config(config_file).context(
        "💀 Couldn't load the configuration. Take a look at the file, make sure every section is there.",
    )?;

    match cli.command {
        Command::Populate { today } => {
            let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
            let outcome = formq::populate(app_config, today).await?;
            println!("{}", summary_table(&outcome));
            println!("{outcome}");
        }
        Command::Process { item } => {
            let raw = tokio::fs::read_to_string(&item)
                .await
                .context(format!("💀 Couldn't read the work item at '{}'", item.display()))?;
            let work_item = WorkItem::decode(&raw)?;
            let outcome = formq::process(app_config, &work_item).await?;
            println!("{outcome}");
        }
    }
    Ok(())
}

fn validated(path: &Path) -> Result<&Path> {
    let exists = path.try_exists().context(format!(
        "💀 Couldn't check whether the configuration file exists. Was checking here: '{}'",
        path.display()
    ))?;
    if !exists {
        anyhow::bail!(
            "💀 Configuration file not found at '{}'. Maybe it's a pwd/cwd thing with relative \
             paths. An absolute path is absolutely certain.",
            path.display()
        );
    }
    Ok(path)
}

/// 🍽️ The run, as a table you can read from across the room.
fn summary_table(outcome: &RunOutcome) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Reference", "Window", "Submissions", "Succeeded", "Failed"]);
    match outcome {
        RunOutcome::AlreadyQueued { reference } => {
            table.add_row(vec![reference.as_str(), "already queued", "-", "-", "-"]);
        }
        RunOutcome::Enqueued {
            reference,
            window,
            submissions,
            summary,
        } => {
            table.add_row(vec![
                reference.clone(),
                window.to_string(),
                submissions.to_string(),
                summary.succeeded.to_string(),
                summary.failed.to_string(),
            ]);
        }
    }
    table
}
