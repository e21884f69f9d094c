//! Relative-day phrase rule and time-of-day extraction.
//!
//! The server-side fallback: "hari ini", "besok"/"besuk", "lusa", bare
//! weekday names (next strictly-future occurrence), and combinations such
//! as "besok kamis". Time extraction understands `HH:MM`, `HH.MM`, and
//! "jam/pukul H[.MM]" forms plus the Indonesian day-part words.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

static HHMM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[:.](\d{2})\b").expect("valid regex"));

static JAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:jam|pukul)\s*(\d{1,2})(?:[:.](\d{2}))?\b").expect("valid regex")
});

static EVENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:malam|sore|petang|pm)\b|\bp\.m\.").expect("valid regex"));

static MORNING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:pagi|am)\b|\ba\.m\.").expect("valid regex"));

static NOON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bsiang\b").expect("valid regex"));

static HARI_INI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhari\s*ini\b").expect("valid regex"));

static BESOK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:besok|besuk)\b").expect("valid regex"));

static LUSA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\blusa\b").expect("valid regex"));

/// Day names in Sunday-first numbering, checked in this order.
///
/// Unlike the next-week rule this one treats "minggu" as the weekday
/// Sunday whenever it appears; the ambiguity is resolved differently per
/// call site.
static DAY_NAMES: LazyLock<Vec<(Regex, u32)>> = LazyLock::new(|| {
    [
        ("minggu", 0),
        ("ahad", 0),
        ("senin", 1),
        ("selasa", 2),
        ("rabu", 3),
        ("kamis", 4),
        ("jumat", 5),
        ("jum'at", 5),
        ("sabtu", 6),
    ]
    .iter()
    .map(|(name, idx)| {
        let pattern = format!(r"\b{}\b", regex::escape(name));
        (Regex::new(&pattern).expect("valid regex"), *idx)
    })
    .collect()
});

/// Extract an hour/minute pair from text, adjusted for Indonesian
/// day-part words: "malam"/"sore"/"petang"/"pm" add 12 below 12,
/// "pagi"/"am" force 12 to 0, "siang" lifts below-12 hours to 12.
///
/// Hours outside 0–23 (or minutes outside 0–59) after adjustment make the
/// match inert rather than rolling into the next day.
#[must_use]
pub fn extract_time(text: &str) -> Option<(u32, u32)> {
    let s = text.to_lowercase();

    let adjust = |hh: u32, mm: u32| -> Option<(u32, u32)> {
        let mut hh = hh;
        if EVENING.is_match(&s) && hh < 12 {
            hh += 12;
        }
        if MORNING.is_match(&s) && hh == 12 {
            hh = 0;
        }
        if NOON.is_match(&s) && hh < 12 {
            hh = 12;
        }
        if hh > 23 || mm > 59 {
            return None;
        }
        Some((hh, mm))
    };

    if let Some(c) = HHMM.captures(&s) {
        let hh = c.get(1)?.as_str().parse().ok()?;
        let mm = c.get(2)?.as_str().parse().ok()?;
        return adjust(hh, mm);
    }

    if let Some(c) = JAM.captures(&s) {
        let hh = c.get(1)?.as_str().parse().ok()?;
        let mm = c.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        return adjust(hh, mm);
    }

    None
}

/// Day index in Sunday-first numbering for a date.
fn sunday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

/// The next occurrence of `target` strictly after `from` (never `from`
/// itself).
fn next_day_of_week(from: NaiveDate, target: u32) -> NaiveDate {
    let mut diff = (i64::from(target) - i64::from(sunday_index(from))).rem_euclid(7);
    if diff == 0 {
        diff = 7;
    }
    from + Duration::days(diff)
}

/// Parse a relative-day phrase against the reference `now`.
///
/// A day with no time defaults to 09:00; a time with no day implies
/// today; text with neither is `None`.
#[must_use]
pub fn parse_relative_phrase(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let s = text.to_lowercase();
    let today = now.date();

    let has_hari_ini = HARI_INI.is_match(&s);
    let has_besok = BESOK.is_match(&s);
    let has_lusa = LUSA.is_match(&s);

    let target = DAY_NAMES
        .iter()
        .find(|(re, _)| re.is_match(&s))
        .map(|(_, idx)| *idx);

    let mut date: Option<NaiveDate> = None;
    if has_hari_ini {
        date = Some(today);
    }

    if let Some(idx) = target {
        if has_besok {
            // "besok kamis": prefer tomorrow when it is that weekday.
            let tomorrow = today + Duration::days(1);
            date = Some(if sunday_index(tomorrow) == idx {
                tomorrow
            } else {
                next_day_of_week(today, idx)
            });
        } else if has_lusa {
            let two_days = today + Duration::days(2);
            date = Some(if sunday_index(two_days) == idx {
                two_days
            } else {
                next_day_of_week(today, idx)
            });
        } else if date.is_none() {
            date = Some(next_day_of_week(today, idx));
        }
    } else if date.is_none() {
        if has_besok {
            date = Some(today + Duration::days(1));
        } else if has_lusa {
            date = Some(today + Duration::days(2));
        }
    }

    let time = extract_time(text);
    if date.is_none() && time.is_some() {
        date = Some(today);
    }

    let (hh, mm) = time.unwrap_or((9, 0));
    date?.and_hms_opt(hh, mm, 0)
}
