//! Ingatin: personal to-do service with WhatsApp reminders.
//!
//! A small HTTP API persists the task list as one JSON document,
//! schedules a WhatsApp reminder ahead of each due time, and converts
//! free-text Indonesian sentences into structured tasks.
//!
//! # Architecture
//!
//! - **store**: whole-document JSON persistence, the only durable state
//! - **reminder**: the scheduler; one abortable timer per task, rebuilt
//!   wholesale from every snapshot and resynced on a fixed cadence
//! - **parse**: deterministic Indonesian date/time phrase rules
//! - **extract**: free text → `{title, due, priority}` drafts (LLM reply
//!   normalization plus heuristic fallbacks)
//! - **watsonx** / **notify**: the external collaborators (LLM text
//!   generation, WhatsApp Cloud API)
//! - **server**: the axum API tying it together

pub mod config;
pub mod error;
pub mod extract;
pub mod notify;
pub mod parse;
pub mod reminder;
pub mod server;
pub mod store;
pub mod task;
pub mod watsonx;

pub use config::AppConfig;
pub use error::{Result, TodoError};
pub use reminder::ReminderScheduler;
pub use store::TaskStore;
pub use task::{Priority, Task};
