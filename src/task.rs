//! Task model and pure list-view logic.
//!
//! The wire schema matches the persisted JSON document (camelCase keys).
//! Field parsing is deliberately lenient: the document is client-owned, so
//! a malformed `due` or a missing `remindBeforeMinutes` must degrade to
//! "no reminder" rather than reject the whole list.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;

/// Task priority, lowest to highest urgency: `low`, `medium`, `high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Sort rank: smaller is more urgent.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// A single to-do item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Task {
    /// Opaque client-assigned identifier, stable for the task's lifetime.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Due instant; `None` means no deadline and no reminder.
    #[serde(deserialize_with = "lenient_datetime")]
    pub due: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_priority")]
    pub priority: Priority,
    pub done: bool,
    pub pinned: bool,
    /// Creation time in epoch milliseconds; ordering tie-break.
    pub created_at: i64,
    /// Minutes before `due` to send the reminder; -1 disables it.
    #[serde(deserialize_with = "lenient_minutes")]
    pub remind_before_minutes: i64,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            due: None,
            priority: Priority::Medium,
            done: false,
            pinned: false,
            created_at: 0,
            remind_before_minutes: -1,
        }
    }
}

impl Task {
    /// The instant the reminder for this task should fire, when it has one.
    ///
    /// `None` when the task has no due time or reminders are disabled.
    #[must_use]
    pub fn reminder_fire_at(&self) -> Option<DateTime<Utc>> {
        let due = self.due?;
        if self.remind_before_minutes < 0 {
            return None;
        }
        Some(due - Duration::minutes(self.remind_before_minutes))
    }
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

fn lenient_priority<'de, D>(deserializer: D) -> Result<Priority, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let priority = match value.as_ref().and_then(serde_json::Value::as_str) {
        Some(s) if s.eq_ignore_ascii_case("low") => Priority::Low,
        Some(s) if s.eq_ignore_ascii_case("high") => Priority::High,
        _ => Priority::Medium,
    };
    Ok(priority)
}

fn lenient_minutes<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let minutes = value
        .as_ref()
        .and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().map(|f| f as i64))
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .unwrap_or(-1);
    Ok(minutes)
}

// ---------------------------------------------------------------------------
// List views
// ---------------------------------------------------------------------------

/// Which subset of the task list to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Pinned,
    /// Not yet done.
    Active,
    Done,
    /// Due today (UTC date of `now`).
    Today,
    /// Past due and not done.
    Overdue,
    /// Due on a specific date.
    OnDate(NaiveDate),
}

impl TaskFilter {
    /// Parse a query-string value; a `YYYY-MM-DD` literal selects that day.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "pinned" => Some(Self::Pinned),
            "active" => Some(Self::Active),
            "done" => Some(Self::Done),
            "today" => Some(Self::Today),
            "overdue" => Some(Self::Overdue),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .ok()
                .map(Self::OnDate),
        }
    }
}

/// List ordering. Pinned tasks always sort first regardless of key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Soonest deadline first; tasks without a due date last.
    #[default]
    DueAsc,
    /// Latest deadline first; tasks without a due date still last.
    DueDesc,
    /// Most urgent priority first.
    Prio,
    /// Newest first.
    CreatedDesc,
}

impl SortKey {
    /// Parse a query-string value (the client's sort key names).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dueAsc" => Some(Self::DueAsc),
            "dueDesc" => Some(Self::DueDesc),
            "prio" => Some(Self::Prio),
            "createdDesc" => Some(Self::CreatedDesc),
            _ => None,
        }
    }
}

/// Select the tasks matching `filter`, in input order.
#[must_use]
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: TaskFilter, now: DateTime<Utc>) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| match filter {
            TaskFilter::All => true,
            TaskFilter::Pinned => t.pinned,
            TaskFilter::Active => !t.done,
            TaskFilter::Done => t.done,
            TaskFilter::Today => {
                !t.done && t.due.is_some_and(|d| d.date_naive() == now.date_naive())
            }
            TaskFilter::Overdue => !t.done && t.due.is_some_and(|d| d < now),
            TaskFilter::OnDate(date) => t.due.is_some_and(|d| d.date_naive() == date),
        })
        .collect()
}

/// Sort a task view in place: pinned first, then by `key` with the
/// client's tie-break chain.
pub fn sort_tasks(tasks: &mut [&Task], key: SortKey) {
    tasks.sort_by(|a, b| compare_tasks(a, b, key));
}

fn due_millis(task: &Task) -> Option<i64> {
    task.due.map(|d| d.timestamp_millis())
}

fn compare_tasks(a: &Task, b: &Task, key: SortKey) -> Ordering {
    // Pinned entries float to the top under every sort key.
    let pinned = b.pinned.cmp(&a.pinned);
    if pinned != Ordering::Equal {
        return pinned;
    }

    let due_asc = |a: &Task, b: &Task| match (due_millis(a), due_millis(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    let prio = |a: &Task, b: &Task| a.priority.rank().cmp(&b.priority.rank());
    let created_desc = |a: &Task, b: &Task| b.created_at.cmp(&a.created_at);

    match key {
        SortKey::Prio => prio(a, b)
            .then_with(|| due_asc(a, b))
            .then_with(|| created_desc(a, b)),
        SortKey::CreatedDesc => created_desc(a, b)
            .then_with(|| due_asc(a, b))
            .then_with(|| prio(a, b)),
        SortKey::DueAsc => due_asc(a, b)
            .then_with(|| prio(a, b))
            .then_with(|| created_desc(a, b)),
        SortKey::DueDesc => {
            // Descending on the due instant, but undated tasks stay last.
            let due_desc = match (due_millis(a), due_millis(b)) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            due_desc
                .then_with(|| prio(a, b))
                .then_with(|| created_desc(a, b))
        }
    }
}
