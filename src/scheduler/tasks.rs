use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use futures::future::join_all;
use tokio_cron_scheduler::Job;
use tracing::{debug, error, info, warn};

use crate::platform::MessagingGateway;
use crate::scheduler::Scheduler;
use crate::store::reminders::DueReminder;
use crate::store::Store;

const HEARTBEAT_CRON: &str = "0 0 * * * *";

async fn deliver(store: &Store, gateway: &dyn MessagingGateway, reminder: DueReminder) -> Result<bool> {
    let text = format!("⏰ Reminder: {}", reminder.reminder_text);
    match gateway.send_message(&reminder.whatsapp_number, &text).await {
        Ok(()) => {
            store.mark_reminder_triggered(&reminder.id).await?;
            Ok(true)
        }
        // Left pending so the next sweep retries it.
        Err(e) => {
            warn!(
                "Failed to deliver reminder {} (due {}): {:#}",
                reminder.id, reminder.reminder_time, e
            );
            Ok(false)
        }
    }
}

/// Send every pending reminder that is due and mark it triggered.
/// Returns how many were delivered.
pub async fn deliver_due_reminders(store: &Store, gateway: &dyn MessagingGateway) -> Result<usize> {
    let due = store.due_reminders(Local::now().naive_local()).await?;
    let results = join_all(due.into_iter().map(|reminder| deliver(store, gateway, reminder))).await;

    let mut delivered = 0;
    for result in results {
        if result? {
            delivered += 1;
        }
    }
    Ok(delivered)
}

/// Sweep for due reminders on `cron_expr` (with a seconds field).
fn reminder_job(cron_expr: &str, store: Store, gateway: Arc<dyn MessagingGateway>) -> Result<Job> {
    Job::new_async(cron_expr, move |_uuid, _lock| {
        let store = store.clone();
        let gateway = gateway.clone();
        Box::pin(async move {
            debug!("Running reminder sweep");
            match deliver_due_reminders(&store, gateway.as_ref()).await {
                Ok(0) => {}
                Ok(n) => info!("Delivered {} reminder(s)", n),
                Err(e) => error!("Reminder sweep failed: {:#}", e),
            }
        })
    })
    .with_context(|| format!("Invalid reminder cron expression: {}", cron_expr))
}

/// Hourly liveness line with the raw-input backlog.
fn heartbeat_job(store: Store) -> Result<Job> {
    Job::new_async(HEARTBEAT_CRON, move |_uuid, _lock| {
        let store = store.clone();
        Box::pin(async move {
            match store.unprocessed_raw_input_count().await {
                Ok(pending) => info!("Heartbeat: bot is alive, {} unprocessed input(s)", pending),
                Err(e) => error!("Heartbeat failed: {:#}", e),
            }
        })
    })
    .context("Failed to create heartbeat job")
}

/// Register built-in background tasks
pub async fn register_builtin_tasks(
    scheduler: &Scheduler,
    store: Store,
    gateway: Arc<dyn MessagingGateway>,
    reminder_cron: &str,
) -> Result<()> {
    scheduler
        .add_job("reminders", reminder_job(reminder_cron, store.clone(), gateway)?)
        .await?;
    scheduler.add_job("heartbeat", heartbeat_job(store)?).await?;
    Ok(())
}
