//! Deterministic intent router.
//!
//! A small lexical classifier over the latest user utterance. It only
//! recognizes "list my tasks for <day>" requests, which is the single
//! intent the orchestration loop may satisfy without the model's help.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;

/// Substrings that mark a task-listing request.
const LIST_KEYWORDS: &[&str] = &["taref", "compromiss", "agenda", "quais", "listar"];

const TODAY: &str = "hoje";
const TOMORROW: &str = "amanh";
const YESTERDAY: &str = "ontem";

static EXPLICIT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b").expect("date pattern is valid")
});

/// A day as written by the user.
///
/// Only the ranges month 1..=12 and day 1..=31 are checked, so values such
/// as 31/02 survive and are passed to the tool as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    pub year: u32,
    pub month: u32,
    pub day: u32,
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year().max(0) as u32,
            month: date.month(),
            day: date.day(),
        }
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// True if the text asks about tasks, appointments, or the agenda.
pub fn is_list_intent(text: &str) -> bool {
    let lowered = text.to_lowercase();
    LIST_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Parses the first `dd/mm/yyyy` (or `dd-mm-yyyy`) date in the text.
fn explicit_date(text: &str) -> Option<CalendarDate> {
    let caps = EXPLICIT_DATE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: u32 = caps[3].parse().ok()?;
    if year == 0 || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(CalendarDate { year, month, day })
}

/// Resolves the day a listing request refers to.
///
/// An explicit date wins, then "hoje", "amanhã", and "ontem" relative to
/// `reference`.
pub fn infer_date(text: &str, reference: NaiveDate) -> Option<CalendarDate> {
    let lowered = text.to_lowercase();

    if let Some(date) = explicit_date(&lowered) {
        return Some(date);
    }
    if lowered.contains(TODAY) {
        return Some(reference.into());
    }
    if lowered.contains(TOMORROW) {
        return reference.checked_add_days(Days::new(1)).map(Into::into);
    }
    if lowered.contains(YESTERDAY) {
        return reference.checked_sub_days(Days::new(1)).map(Into::into);
    }
    None
}

/// True when the request must be answered with the day-listing tool even
/// if the model declined to call it.
pub fn should_force_fallback(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if !is_list_intent(&lowered) {
        return false;
    }
    [TODAY, TOMORROW, YESTERDAY]
        .iter()
        .any(|k| lowered.contains(k))
        || explicit_date(&lowered).is_some()
}
