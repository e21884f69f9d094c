//! "Next week" phrase rule.
//!
//! Recognizes a day name combined with a next-week marker ("sabtu minggu
//! depan", "kamis pekan depan", "senin depan", optionally with "jam/pukul/
//! pkl HH[:MM]") and resolves it against the week after the current
//! Monday-started week. Without a day name the rule does not match.

use chrono::{Datelike, Duration, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

static NEXT_WEEK_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:minggu|pekan)\s+depan\b").expect("valid regex"));

static MINGGU_DEPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bminggu\s+depan\b").expect("valid regex"));

static HARI_MINGGU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhari\s+minggu\b").expect("valid regex"));

static DAY_DEPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:senin|selasa|rabu|kamis|jum['’]?at|sabtu|minggu|ahad)\s+depan\b")
        .expect("valid regex")
});

static DAY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(senin|selasa|rabu|kamis|jum['’]?at|sabtu|minggu|ahad)\b").expect("valid regex")
});

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:jam|pukul|pkl)\s*(\d{1,2})[:.]?(\d{2})?\b").expect("valid regex")
});

/// Day index in Sunday-first numbering (Sunday = 0 .. Saturday = 6).
fn day_index(name: &str) -> Option<u32> {
    match name {
        "minggu" | "ahad" => Some(0),
        "senin" => Some(1),
        "selasa" => Some(2),
        "rabu" => Some(3),
        "kamis" => Some(4),
        "sabtu" => Some(6),
        n if n.starts_with("jum") => Some(5),
        _ => None,
    }
}

/// Parse a "<day> next week" phrase against the reference `now`.
///
/// Returns the named day of the week *after* the current week (weeks start
/// on Monday), at the extracted time of day or 00:00. `None` when the
/// phrase lacks a next-week marker or a day name.
#[must_use]
pub fn parse_next_week_phrase(input: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let txt = input.trim().to_lowercase();
    if txt.is_empty() {
        return None;
    }

    let has_next_week = NEXT_WEEK_MARKER.is_match(&txt);
    let has_day_depan = DAY_DEPAN.is_match(&txt);

    // "minggu" may be the weekday Sunday or the unit "week". With a
    // "minggu depan" marker and no explicit "hari minggu", read it as the
    // unit, not a day name.
    let day = DAY_NAME.captures(&txt).and_then(|c| {
        let name = c.get(1)?.as_str();
        let unit_week = MINGGU_DEPAN.is_match(&txt) && !HARI_MINGGU.is_match(&txt);
        if name == "minggu" && unit_week {
            None
        } else {
            day_index(name)
        }
    });

    let target_dow = match (has_next_week || has_day_depan, day) {
        (true, Some(dow)) => dow,
        _ => return None,
    };

    let (hh, mm) = TIME
        .captures(&txt)
        .map(|c| {
            let hh: u32 = c.get(1).map_or(0, |m| m.as_str().parse().unwrap_or(0));
            let mm: u32 = c.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
            (hh.min(23), mm.min(59))
        })
        .unwrap_or((0, 0));

    let monday_this_week =
        now.date() - Duration::days(i64::from(now.date().weekday().num_days_from_monday()));
    let next_monday = monday_this_week + Duration::days(7);
    // Offset from Monday: Monday = 0 .. Sunday = 6.
    let offset = (target_dow + 6) % 7;
    let target = next_monday + Duration::days(i64::from(offset));

    target.and_hms_opt(hh, mm, 0)
}
