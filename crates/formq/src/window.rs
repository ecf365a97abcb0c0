//! 📅 Window filter — "last week", computed the same way every Monday, Tuesday, or Sunday.
//!
//! 🎬 COLD OPEN — INT. CALENDAR — A WEDNESDAY THAT THINKS IT'S SPECIAL
//!
//! It is 2025-06-18. Someone asks for "last week". The window answers 2025-06-02 through
//! 2025-06-08, Monday through Sunday, and it will answer the same thing if you ask on the
//! Thursday or the Sunday after. Consistency is the whole personality of this module. 🦆
//!
//! 🧠 Knowledge graph:
//! - `start = today - (weekday + 7)` where Monday is 0; `end = start + 6`
//! - Inclusive on both ends, compared by calendar date only
//! - The completion timestamp goes through `transforms::parse_timestamp`, so whatever
//!   the datetime extractor accepts, the window accepts

use chrono::{Datelike, Days, NaiveDate};
use tracing::trace;

use crate::common::RawSubmission;
use crate::transforms::{entity_value, parse_timestamp};

/// 🏷️ Placeholder for the window's Monday inside a file name template.
pub const START_TOKEN: &str = "monday_last_week";
/// 🏷️ Placeholder for the window's Sunday inside a file name template.
pub const END_TOKEN: &str = "sunday_last_week";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// 📅 An inclusive Monday..Sunday date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    /// 📅 The full Monday–Sunday week before the week containing `today`.
    pub fn select(today: NaiveDate) -> Self {
        let back = u64::from(today.weekday().num_days_from_monday()) + 7;
        // -- chrono only refuses this at the edge of representable time. Stay put if so.
        let start = today.checked_sub_days(Days::new(back)).unwrap_or(today);
        let end = start.checked_add_days(Days::new(6)).unwrap_or(start);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// ✅ Did this submission complete inside the window?
    ///
    /// No completion value, an empty one, or one that doesn't parse: excluded, silently.
    pub fn includes(&self, submission: &RawSubmission) -> bool {
        let Some(completed) = entity_value(&submission.entity, "completed").and_then(|v| v.as_str())
        else {
            return false;
        };
        if completed.is_empty() {
            return false;
        }
        match parse_timestamp(completed) {
            Ok(ts) => self.contains(ts.date()),
            Err(parse_error) => {
                trace!(%parse_error, "📅 completion timestamp unreadable, submission excluded");
                false
            }
        }
    }

    /// 🏷️ Swap the window tokens in a template for real dates. The template itself is untouched.
    pub fn resolve_template(&self, template: &str) -> String {
        template
            .replace(START_TOKEN, &self.start.format(DATE_FORMAT).to_string())
            .replace(END_TOKEN, &self.end.format(DATE_FORMAT).to_string())
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// 📅 `select_window(today)`
pub fn select_window(today: NaiveDate) -> Window {
    Window::select(today)
}

/// ✅ `in_window(submission, window)`
pub fn in_window(submission: &RawSubmission, window: &Window) -> bool {
    window.includes(submission)
}
