//! Structured task extraction for the parse endpoint.
//!
//! Turns a free-text Indonesian sentence into a `{title, due, priority}`
//! draft: the LLM reply is normalized when one is available, the relative
//! phrase rule fills a missing due, and a keyword heuristic covers the
//! no-LLM case. The endpoint never returns nothing for non-empty input;
//! at worst the draft is the raw text with no due date.

use crate::parse::{extract_time, parse_relative_phrase};
use crate::task::Priority;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static PRIORITY_HIGH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:tinggi|urgent|mendesak|high)\b").expect("valid regex")
});

static PRIORITY_LOW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:rendah|low)\b").expect("valid regex"));

static LITERAL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b|\b(\d{4})-(\d{1,2})-(\d{1,2})\b")
        .expect("valid regex")
});

/// A structured task guess returned by the parse endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    /// Due instant, or `null` when the text gave nothing usable.
    pub due: Option<DateTime<Utc>>,
    pub priority: Priority,
}

impl TaskDraft {
    /// The bare fallback: the raw text as title, no due, medium priority.
    #[must_use]
    pub fn bare(input: &str) -> Self {
        Self {
            title: input.trim().to_owned(),
            due: None,
            priority: Priority::Medium,
        }
    }
}

/// Instruction prompt for the LLM: extract task details, reply JSON only.
#[must_use]
pub fn build_prompt(input: &str) -> String {
    format!(
        r#"Ekstrak detail tugas dari kalimat berikut dan balas HANYA JSON valid.
Field wajib:
- "title": string
- "due": ISO8601 (contoh "2025-08-28T19:00:00Z") atau null jika tidak jelas
- "priority": salah satu dari ["low","medium","high"]
Contoh:
Kalimat: "rapat ekraf kamis jam 19:00"
Jawaban: {{"title":"rapat ekraf","due":"2025-08-28T19:00:00Z","priority":"medium"}}
Kalimat: {input}
"#
    )
}

/// Keyword heuristic used when no LLM is configured: priority words and a
/// literal `dd/mm/yyyy` or `yyyy-mm-dd` date. Returns `None` for empty
/// input only.
#[must_use]
pub fn naive_parse(input: &str) -> Option<TaskDraft> {
    let text = input.trim();
    if text.is_empty() {
        return None;
    }

    let priority = if PRIORITY_HIGH.is_match(text) {
        Priority::High
    } else if PRIORITY_LOW.is_match(text) {
        Priority::Low
    } else {
        Priority::Medium
    };

    let due = LITERAL_DATE.captures(text).and_then(|c| {
        let (y, m, d) = if c.get(1).is_some() {
            (c[3].parse().ok()?, c[2].parse().ok()?, c[1].parse().ok()?)
        } else {
            (c[4].parse().ok()?, c[5].parse().ok()?, c[6].parse().ok()?)
        };
        let date = NaiveDate::from_ymd_opt(y, m, d)?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc())
    });

    Some(TaskDraft {
        title: text.to_owned(),
        due,
        priority,
    })
}

/// Normalize an LLM reply into a [`TaskDraft`].
///
/// The reply is parsed tolerantly; a missing or invalid `due` falls back
/// to the relative phrase rule over the raw input, and a midnight `due`
/// picks up a time of day found in the input. Priority outside the
/// three-value set becomes `medium`.
#[must_use]
pub fn normalize_llm_reply(reply: &str, input: &str, now_local: NaiveDateTime) -> TaskDraft {
    let parsed: serde_json::Value = serde_json::from_str(reply.trim()).unwrap_or_default();

    let title = parsed
        .get("title")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(input.trim())
        .to_owned();

    let mut due = parsed
        .get("due")
        .and_then(serde_json::Value::as_str)
        .and_then(parse_llm_datetime);

    // The model gave nothing usable: try the deterministic phrase rule.
    if due.is_none() {
        due = parse_relative_phrase(input, now_local).map(local_naive_to_utc);
    }

    // A bare-date due at 00:00 local gains the time found in the text.
    if let Some(instant) = due
        && let Some((hh, mm)) = extract_time(input)
    {
        let local = instant.with_timezone(&Local);
        if local.hour() == 0 && local.minute() == 0
            && let Some(adjusted) = local.date_naive().and_hms_opt(hh, mm, 0)
        {
            due = Some(local_naive_to_utc(adjusted));
        }
    }

    let priority = parsed
        .get("priority")
        .and_then(serde_json::Value::as_str)
        .map(str::to_lowercase)
        .and_then(|p| match p.as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        })
        .unwrap_or_default();

    TaskDraft { title, due, priority }
}

/// Parse a due string from the model: RFC 3339, or a bare local datetime
/// treated as UTC.
fn parse_llm_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Interpret a naive wall-clock time in the server's local zone.
///
/// Ambiguous or skipped DST times resolve to the earliest valid instant.
#[must_use]
pub fn local_naive_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.with_timezone(&Utc)
        }
        chrono::LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::Duration;

    fn tuesday_morning() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 7)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn prompt_embeds_the_sentence() {
        let prompt = build_prompt("rapat ekraf kamis jam 19:00");
        assert!(prompt.contains("Kalimat: rapat ekraf kamis jam 19:00"));
        assert!(prompt.contains("HANYA JSON valid"));
    }

    #[test]
    fn naive_parse_detects_priority_keywords() {
        assert_eq!(naive_parse("tugas mendesak").unwrap().priority, Priority::High);
        assert_eq!(naive_parse("urgent: bayar listrik").unwrap().priority, Priority::High);
        assert_eq!(naive_parse("prioritas rendah").unwrap().priority, Priority::Low);
        assert_eq!(naive_parse("biasa saja").unwrap().priority, Priority::Medium);
        assert!(naive_parse("   ").is_none());
    }

    #[test]
    fn naive_parse_reads_literal_dates() {
        let draft = naive_parse("bayar pajak 31/12/2025").unwrap();
        assert_eq!(
            draft.due,
            Some(Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap())
        );

        let draft = naive_parse("kumpul laporan 2025-09-01").unwrap();
        assert_eq!(
            draft.due,
            Some(Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap())
        );

        assert!(naive_parse("tanpa tanggal").unwrap().due.is_none());
    }

    #[test]
    fn valid_llm_reply_passes_through() {
        let reply = r#"{"title":"rapat ekraf","due":"2025-08-28T19:00:00Z","priority":"high"}"#;
        let draft = normalize_llm_reply(reply, "rapat ekraf kamis", tuesday_morning());
        assert_eq!(draft.title, "rapat ekraf");
        assert_eq!(
            draft.due,
            Some(Utc.with_ymd_and_hms(2025, 8, 28, 19, 0, 0).unwrap())
        );
        assert_eq!(draft.priority, Priority::High);
    }

    #[test]
    fn garbage_reply_falls_back_to_the_phrase_rule() {
        let draft = normalize_llm_reply("sorry, no JSON", "besok jam 7 malam", tuesday_morning());
        assert_eq!(draft.title, "besok jam 7 malam");
        let expected = local_naive_to_utc(
            NaiveDate::from_ymd_opt(2025, 1, 8)
                .unwrap()
                .and_hms_opt(19, 0, 0)
                .unwrap(),
        );
        assert_eq!(draft.due, Some(expected));
        assert_eq!(draft.priority, Priority::Medium);
    }

    #[test]
    fn unparseable_phrase_yields_no_due() {
        let draft = normalize_llm_reply("{}", "beli susu", tuesday_morning());
        assert_eq!(draft.title, "beli susu");
        assert!(draft.due.is_none());
    }

    #[test]
    fn midnight_due_gains_time_from_the_text() {
        // A local-midnight due plus "jam 7 malam" in the text moves to 19:00.
        let midnight_local = local_naive_to_utc(
            NaiveDate::from_ymd_opt(2025, 8, 28)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        let reply = format!(
            r#"{{"title":"rapat","due":"{}","priority":"medium"}}"#,
            midnight_local.to_rfc3339()
        );
        let draft = normalize_llm_reply(&reply, "rapat kamis jam 7 malam", tuesday_morning());
        let expected = local_naive_to_utc(
            NaiveDate::from_ymd_opt(2025, 8, 28)
                .unwrap()
                .and_hms_opt(19, 0, 0)
                .unwrap(),
        );
        assert_eq!(draft.due, Some(expected));
    }

    #[test]
    fn non_midnight_due_keeps_its_time() {
        let reply = r#"{"title":"rapat","due":"2025-08-28T10:30:00Z","priority":"medium"}"#;
        let draft = normalize_llm_reply(reply, "rapat jam 7 malam", tuesday_morning());
        // Only a 00:00 local due is adjusted; 10:30Z stays (unless it happens
        // to be local midnight, in which case the adjustment applies).
        let as_local = draft.due.unwrap().with_timezone(&Local);
        if as_local.hour() == 0 && as_local.minute() == 0 {
            assert_eq!(as_local.hour(), 19);
        } else {
            assert_eq!(
                draft.due,
                Some(Utc.with_ymd_and_hms(2025, 8, 28, 10, 30, 0).unwrap())
            );
        }
    }

    #[test]
    fn unknown_priority_becomes_medium() {
        let reply = r#"{"title":"x","due":null,"priority":"ASAP"}"#;
        let draft = normalize_llm_reply(reply, "x", tuesday_morning());
        assert_eq!(draft.priority, Priority::Medium);
    }

    #[test]
    fn bare_datetime_from_model_is_read_as_utc() {
        let reply = r#"{"title":"x","due":"2025-08-28T19:00:00","priority":"low"}"#;
        let draft = normalize_llm_reply(reply, "x", tuesday_morning());
        let due = draft.due.unwrap();
        // adjusted only if that instant is local midnight
        if due.with_timezone(&Local).hour() != 0 {
            assert_eq!(due, Utc.with_ymd_and_hms(2025, 8, 28, 19, 0, 0).unwrap());
        }
        assert_eq!(draft.priority, Priority::Low);
    }

    #[test]
    fn draft_serializes_with_null_due() {
        let draft = TaskDraft::bare("beli susu");
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["title"], "beli susu");
        assert!(json["due"].is_null());
        assert_eq!(json["priority"], "medium");
    }

    #[test]
    fn local_conversion_round_trips() {
        let naive = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let utc = local_naive_to_utc(naive);
        let back = utc.with_timezone(&Local).naive_local();
        assert!((back - naive).abs() < Duration::hours(1));
    }
}
