//! Projection of a two-parity [`WeekSchedule`] template onto concrete
//! calendar days.

use chrono::{Datelike, Days, NaiveDate};

use crate::data::models::{DaySchedule, Lesson, Weekday, WeekSchedule};
use crate::schedule::parity::week_parity;

/// Subgroup filter: a whole-group lesson always passes; a subgroup-specific
/// lesson passes only when no subgroup was requested or when it matches
/// exactly.
fn subgroup_matches(lesson: &Lesson, requested: Option<u8>) -> bool {
    match (lesson.subgroup, requested) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(have), Some(want)) => have == want,
    }
}

/// Resolve one calendar day against a group's (or teacher's) template.
///
/// An empty `lessons` list is a valid day off, not an error.
pub fn day_schedule(
    week: &WeekSchedule,
    date: NaiveDate,
    semester_start: NaiveDate,
    subgroup: Option<u8>,
) -> DaySchedule {
    let parity = week_parity(date, semester_start);
    let day = Weekday::from_chrono(date.weekday());

    let mut lessons: Vec<Lesson> = week
        .bucket(parity, day)
        .iter()
        .filter(|l| subgroup_matches(l, subgroup))
        .cloned()
        .collect();
    lessons.sort_by(|a, b| a.start_key().cmp(b.start_key()));

    DaySchedule {
        date,
        day_of_week: day.label().to_string(),
        lessons,
    }
}

/// Seven consecutive days starting at `start_date`, each resolved through the
/// same parity path as [`day_schedule`].
pub fn week_schedule_from(
    week: &WeekSchedule,
    start_date: NaiveDate,
    semester_start: NaiveDate,
    subgroup: Option<u8>,
) -> Vec<DaySchedule> {
    (0..7)
        .map(|offset| day_schedule(week, start_date + Days::new(offset), semester_start, subgroup))
        .collect()
}
