//! Deterministic Indonesian date/time phrase rules.
//!
//! Two independent rule sets turn free text plus a reference "now" into an
//! absolute wall-clock time:
//!
//! - [`next_week`]: the quick-path rule for "<day> minggu/pekan depan" and
//!   "<day> depan" phrases, anchored to the Monday that starts the week
//!   after the current one.
//! - [`relative`]: the fallback rule for "hari ini" / "besok" / "lusa" /
//!   bare weekday phrases with Indonesian day-part time adjustment.
//!
//! The rules intentionally disagree on some phrasings (most notably how
//! the word "minggu" reads as weekday-Sunday vs. the unit "week") and are
//! kept separate per call site rather than unified.
//!
//! Both are pure functions over [`chrono::NaiveDateTime`]: same text and
//! same reference instant always produce the same result. Callers decide
//! how naive local times map to instants. Unrecognized text is `None`,
//! never "now".

pub mod next_week;
pub mod relative;

pub use next_week::parse_next_week_phrase;
pub use relative::{extract_time, parse_relative_phrase};
