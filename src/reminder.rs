//! Reminder scheduling.
//!
//! The scheduler owns the only in-memory scheduling state in the system:
//! a map from task id to a pending one-shot timer. Because the durable
//! task list is the sole persistent state (no event log, no per-task
//! scheduling records), consistency is maintained by full
//! resynchronization: every [`ReminderScheduler::rebuild`] cancels all
//! pending timers and reschedules from the given snapshot. Task lists are
//! small and human-edited, so the cancel-and-reschedule cost is noise;
//! do not replace this with incremental diffing unless scheduling state
//! becomes persistent.

use crate::notify::Notifier;
use crate::store::TaskStore;
use crate::task::Task;
use chrono::{DateTime, Local, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A scheduled, not-yet-fired reminder. Never persisted.
struct ScheduleEntry {
    fire_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

/// Maintains at most one pending reminder fire per task id.
pub struct ReminderScheduler {
    /// Pending entries, exclusively owned; the async mutex also serializes
    /// rebuilds so two cancel/reschedule phases never interleave.
    pending: Mutex<HashMap<String, ScheduleEntry>>,
    notifier: Arc<dyn Notifier>,
}

impl ReminderScheduler {
    /// Create a scheduler that delivers through `notifier`.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            notifier,
        })
    }

    /// Resynchronize the pending set from an authoritative snapshot.
    ///
    /// Cancels every pending entry, then schedules one timer per task
    /// whose fire time (`due - remindBeforeMinutes`) is strictly in the
    /// future. Fire times already in the past are dropped, not
    /// back-filled. After this returns, the pending set exactly reflects
    /// the snapshot.
    pub async fn rebuild(self: &Arc<Self>, tasks: &[Task]) {
        let mut pending = self.pending.lock().await;
        for (_, entry) in pending.drain() {
            // Safe and idempotent even when the entry already fired.
            entry.handle.abort();
        }

        let now = Utc::now();
        for task in tasks {
            let Some(fire_at) = task.reminder_fire_at() else {
                continue;
            };
            if fire_at <= now {
                continue;
            }
            let Ok(delay) = (fire_at - now).to_std() else {
                continue;
            };

            let id = task.id.clone();
            let task = task.clone();
            let scheduler = Arc::clone(self);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                scheduler.fire(&task).await;
            });
            // A duplicate id within one snapshot supersedes, never stacks.
            if let Some(old) = pending.insert(id, ScheduleEntry { fire_at, handle }) {
                old.handle.abort();
            }
        }

        debug!(pending = pending.len(), "reminder schedule rebuilt");
    }

    /// Deliver one reminder and consume its entry.
    async fn fire(&self, task: &Task) {
        // Remove the entry before delivery: a fire is consumed whether or
        // not the send works, so a flaky notifier cannot cause retry storms.
        self.pending.lock().await.remove(&task.id);

        let title = if task.title.trim().is_empty() {
            "Tugas"
        } else {
            task.title.as_str()
        };
        let due_local = task.due.map(format_due_local).unwrap_or_default();

        info!(task_id = %task.id, "firing reminder");
        if let Err(e) = self.notifier.send_reminder(title, &due_local).await {
            warn!(task_id = %task.id, error = %e, "reminder delivery failed");
        }
    }

    /// Cancel every pending reminder.
    pub async fn shutdown(&self) {
        let mut pending = self.pending.lock().await;
        let count = pending.len();
        for (_, entry) in pending.drain() {
            entry.handle.abort();
        }
        if count > 0 {
            info!(cancelled = count, "reminder scheduler shut down");
        }
    }

    /// Number of pending reminders.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Fire time of the pending reminder for a task, if one exists.
    pub async fn pending_fire_at(&self, task_id: &str) -> Option<DateTime<Utc>> {
        self.pending.lock().await.get(task_id).map(|e| e.fire_at)
    }
}

/// Humanized local due time for the outbound message.
fn format_due_local(due: DateTime<Utc>) -> String {
    due.with_timezone(&Local).format("%d/%m/%Y %H.%M").to_string()
}

/// Spawn the periodic resynchronization loop.
///
/// Every `every`, the latest durable snapshot is read and fed to
/// [`ReminderScheduler::rebuild`]. This is the safety net against a
/// missed rebuild after a write and against cold starts; a failed read
/// skips the tick rather than touching the pending set. Missed ticks are
/// skipped, not replayed.
pub fn spawn_resync(
    scheduler: Arc<ReminderScheduler>,
    store: Arc<TaskStore>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            match store.read_all().await {
                Ok(tasks) => scheduler.rebuild(&tasks).await,
                Err(e) => warn!("resync skipped, cannot read task store: {e}"),
            }
        }
    })
}
