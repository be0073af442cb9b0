//! # pillminderd — pillminder daemon
//!
//! Composition root that wires all adapters together and runs the
//! reminder loop.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository implementations (adapters)
//! - Construct application services, injecting repositories via port traits
//! - Register the reminder worker with the work scheduler
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod notifier;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use pillminder_adapter_storage_sqlite_sqlx::{
    Config as StorageConfig, SqliteDeliveryLog, SqliteMedicineRepository,
};
use pillminder_app::event_bus::InProcessChangeBus;
use pillminder_app::ports::{ChangePublisher, Clock, MedicineRepository, SystemClock};
use pillminder_app::reminder_worker::ReminderWorker;
use pillminder_app::report;
use pillminder_app::services::medicine_service::MedicineService;
use pillminder_app::view_state::{ListFilter, MedicineListView};
use pillminder_app::work_scheduler::{Registration, WorkScheduler};

use crate::config::Config;
use crate::notifier::LogNotifier;

const REMINDER_WORK: &str = "medicine-reminders";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    init_tracing(&config.logging.filter);

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("opening database")?;
    let pool = db.pool().clone();

    // Change bus
    let bus = Arc::new(InProcessChangeBus::default());

    // Services
    let service = Arc::new(MedicineService::new(
        SqliteMedicineRepository::new(pool.clone()),
        Arc::clone(&bus),
        config.evaluator()?,
        SystemClock,
    ));

    // List view
    let view = Arc::new(MedicineListView::new(
        Arc::clone(&service),
        ListFilter::Active,
    ));
    let listener = tokio::spawn({
        let view = Arc::clone(&view);
        let events = bus.subscribe();
        async move { view.listen(events).await }
    });
    let _active_count = view
        .subscribe(|active| tracing::info!(active = active.len(), "active medicines"))
        .await?;

    if let Some(dir) = &config.export.dir {
        export(&service, dir).await?;
    }

    // Background reminders
    let worker = Arc::new(ReminderWorker::new(
        Arc::clone(&service),
        SqliteDeliveryLog::new(pool),
        LogNotifier,
        config.reminder_window(),
    ));
    let scheduler = WorkScheduler::new();
    if scheduler.register(REMINDER_WORK, config.scheduler_config(), worker)
        == Registration::AlreadyScheduled
    {
        tracing::warn!(work = REMINDER_WORK, "reminder work was already scheduled");
    }

    tracing::info!(database = %config.database_url(), "pillminderd running");
    shutdown_signal().await;
    tracing::info!("pillminderd shutting down");

    scheduler.shutdown();
    listener.abort();
    db.close().await;
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter `{filter}` ({err}), falling back to `info`");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Write text and HTML exports of the active medicines into `dir`.
async fn export<R, P, C>(service: &MedicineService<R, P, C>, dir: &Path) -> anyhow::Result<()>
where
    R: MedicineRepository,
    P: ChangePublisher,
    C: Clock,
{
    let entries = service.list(true).await?;
    let now = service.now();
    let today = service.evaluator().local_date(now);

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating export directory {}", dir.display()))?;
    for (extension, body) in [
        ("txt", report::render_text(&entries, now, today)),
        ("html", report::render_html(&entries, now, today)),
    ] {
        let path = dir.join(report::file_name(now, extension));
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("writing export {}", path.display()))?;
        tracing::info!(path = %path.display(), entries = entries.len(), "export written");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
