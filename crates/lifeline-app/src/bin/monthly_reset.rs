//! Monthly reset job entry point.
//!
//! Scheduled near the start of each calendar month (cron or an OS task
//! scheduler); every user whose tracker completed the goal in the previous
//! month gets a fresh tracker, an unblocked account, and a welcome-back
//! email. Safe to re-run.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lifeline_core::clock::{Clock, SystemClock};
use lifeline_core::config::load_config;
use lifeline_core::month::parse_month;
use lifeline_db::db::connection::create_pool;
use lifeline_db::db::DbProvider;
use lifeline_service::notify::{Notifier, log::LogNotifier, smtp::SmtpNotifier};
use lifeline_service::tracker::{
    PgTrackerStore, PgUserDirectory, ResetJobOptions, TrackerEngine,
};

#[derive(Debug, Parser)]
#[command(name = "monthly-reset")]
#[command(about = "Reset monthly donation counts for users when a new month begins")]
struct Args {
    /// Specific month to reset in YYYY-MM format (default: current month)
    #[arg(long)]
    month: Option<String>,

    /// Show what would be reset without actually doing it
    #[arg(long)]
    dry_run: bool,

    /// Force reset even if already done for the month
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let target_month = match &args.month {
        Some(input) => match parse_month(input) {
            Ok(month) => Some(month),
            Err(_) => {
                eprintln!("Invalid month format '{input}'. Use YYYY-MM (e.g., 2025-09)");
                return Ok(ExitCode::FAILURE);
            }
        },
        None => None,
    };

    let config = load_config()?;
    let pool = create_pool(
        &config.database.url,
        u32::from(config.database.max_connections),
    )
    .await?;
    let provider: Arc<dyn DbProvider> = Arc::new(pool);

    let notifier: Arc<dyn Notifier> = if config.smtp.enabled {
        Arc::new(SmtpNotifier::new(&config.smtp)?)
    } else {
        tracing::warn!("SMTP disabled, unblock notices will be logged only");
        Arc::new(LogNotifier)
    };

    let engine = TrackerEngine::new(
        Arc::new(PgTrackerStore::new(Arc::clone(&provider))),
        Arc::new(PgUserDirectory::new(provider)),
        Arc::new(SystemClock) as Arc<dyn Clock>,
        notifier,
    );

    let report = engine
        .run_monthly_reset(ResetJobOptions {
            target_month,
            dry_run: args.dry_run,
            force: args.force,
        })
        .await?;

    println!("Processing monthly reset for: {}", report.month_label());
    println!("Found {} users blocked in previous month", report.candidates);

    if report.dry_run {
        println!(
            "DRY RUN COMPLETE: would create {} new trackers and reset {} existing trackers",
            report.created, report.reset
        );
    } else {
        println!(
            "RESET COMPLETE: created {} new trackers, reset {} trackers, skipped {}, sent {} unblock notices",
            report.created, report.reset, report.skipped, report.notified
        );
    }

    if report.failures.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        for (user_id, error) in &report.failures {
            eprintln!("Failed to reset user {user_id}: {error}");
        }
        Ok(ExitCode::FAILURE)
    }
}
