//! Week-parity resolution: the sole authority for mapping a calendar date to
//! one of the two alternating templates.
//!
//! Both the group-schedule and the teacher-schedule lookup paths must resolve
//! parity through this module so the same date can never yield divergent
//! results.

use chrono::{Datelike, Days, NaiveDate};

use crate::data::models::WeekParity;

/// Monday of the week containing `date`.
fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Zero-based count of whole weeks between the Monday-aligned starts of
/// `date`'s week and `semester_start`'s week.
///
/// Negative for dates before the semester start week; parity stays consistent
/// there too (rem_euclid), though such dates are outside normal operation.
fn week_offset(date: NaiveDate, semester_start: NaiveDate) -> i64 {
    (monday_of(date) - monday_of(semester_start)).num_days() / 7
}

/// Which template applies on `date`. The semester's first week is week 1 and
/// is odd, so an even week offset means odd parity.
pub fn week_parity(date: NaiveDate, semester_start: NaiveDate) -> WeekParity {
    if week_offset(date, semester_start).rem_euclid(2) == 0 {
        WeekParity::Odd
    } else {
        WeekParity::Even
    }
}

/// Absolute 1-based semester week number for `date`, used to anchor explicit
/// «N - M нед.» ranges and substitution dates.
pub fn semester_week_number(date: NaiveDate, semester_start: NaiveDate) -> i64 {
    week_offset(date, semester_start) + 1
}
