//! Teacher name normalization and the per-teacher aggregated schedule view.
//!
//! The portal's teacher field is unstructured free text: academic titles and
//! degrees stack in front of the name («доц. к.т.н. Андреева А. А.»), a
//! remote-instruction marker may trail it («(ДОТ)»), and the same column
//! sometimes carries room codes, clock times, or subject strings. Everything
//! here exists to turn that noise into a stable set of teacher keys and to
//! invert the group-indexed snapshot into a per-teacher week view.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::data::models::{DaySchedule, TimetableData, Weekday, WeekParity, WeekSchedule};
use crate::schedule::project::week_schedule_from;

/// Academic title and degree prefixes, stripped repeatedly since several can
/// stack in front of one name.
const TITLE_PREFIXES: &[&str] = &[
    "доц.",
    "проф.",
    "преп.",
    "ст. преп.",
    "ст.преп.",
    "асс.",
    "зав. каф.",
    "зав.каф.",
    "к.т.н.",
    "к.э.н.",
    "к.п.н.",
    "к.х.н.",
    "к.ф.н.",
    "к.ф.-м.н.",
    "д.т.н.",
    "д.э.н.",
    "д.ф.-м.н.",
];

/// Upper bound on normalization passes; real data never stacks this deep.
const MAX_STRIP_PASSES: usize = 8;

static REMOTE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\s*ДОТ\s*\)\s*$").unwrap());
static ROOM_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[А-ЯЁа-яё]{1,3}-?\d{1,4}[а-яё]?$").unwrap());
static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}").unwrap());
static TYPE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((лк|лб|пр|ср|кр|экз|зач)\.?\)\s*$").unwrap());

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip stacked title/degree prefixes and the trailing remote annotation,
/// iterating until no pattern matches.
///
/// # Examples
///
/// ```
/// use raspisanie::schedule::teachers::normalize_teacher_name;
///
/// assert_eq!(normalize_teacher_name("доц.  к.т.н. Андреева А. А."), "Андреева А. А.");
/// assert_eq!(normalize_teacher_name("Аринина Н. Н. (ДОТ)"), "Аринина Н. Н.");
/// ```
pub fn normalize_teacher_name(raw: &str) -> String {
    let mut name = collapse_whitespace(raw);

    for _ in 0..MAX_STRIP_PASSES {
        let before = name.clone();

        for prefix in TITLE_PREFIXES {
            if let Some(rest) = strip_prefix_caseless(&name, prefix) {
                name = collapse_whitespace(rest);
            }
        }
        name = collapse_whitespace(&REMOTE_SUFFIX.replace(&name, ""));

        if name == before {
            break;
        }
    }

    name
}

/// Case-insensitive prefix strip that works on Cyrillic.
fn strip_prefix_caseless<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = s;
    for pc in prefix.chars() {
        let sc = rest.chars().next()?;
        if !sc.to_lowercase().eq(pc.to_lowercase()) {
            return None;
        }
        rest = &rest[sc.len_utf8()..];
    }
    Some(rest)
}

/// Whether a normalized string plausibly names a person.
///
/// The source column shares space with room codes, clock times and
/// subject-with-type strings; all of those are rejected here.
pub fn is_plausible_teacher_name(name: &str) -> bool {
    let name = name.trim();
    if name.chars().count() < 5 {
        return false;
    }
    if !name.chars().any(|c| c.is_uppercase() && is_cyrillic(c)) {
        return false;
    }
    if ROOM_CODE.is_match(name) || CLOCK_TIME.is_match(name) {
        return false;
    }
    if TYPE_SUFFIX.is_match(name) {
        return false;
    }
    true
}

fn is_cyrillic(c: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&c)
}

/// Normalized teacher names with a reverse map back to one original titled
/// form, used to re-query the raw snapshot after presenting normalized names.
pub struct TeacherIndex {
    names: Vec<String>,
    originals: HashMap<String, String>,
}

impl TeacherIndex {
    /// Scan every group's two parity buckets across all seven weekdays.
    pub fn build(data: &TimetableData) -> Self {
        let mut originals: HashMap<String, String> = HashMap::new();

        for (_, schedule) in data.groups() {
            for_each_lesson(schedule, |_, _, lesson| {
                let Some(raw) = lesson.teacher.as_deref() else {
                    return;
                };
                let normalized = normalize_teacher_name(raw);
                if is_plausible_teacher_name(&normalized) {
                    originals.entry(normalized).or_insert_with(|| raw.to_string());
                }
            });
        }

        let mut names: Vec<String> = originals.keys().cloned().collect();
        names.sort();
        TeacherIndex { names, originals }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn original_form(&self, normalized: &str) -> Option<&str> {
        self.originals.get(normalized).map(String::as_str)
    }
}

fn for_each_lesson(
    schedule: &WeekSchedule,
    mut f: impl FnMut(WeekParity, Weekday, &crate::data::models::Lesson),
) {
    for parity in [WeekParity::Odd, WeekParity::Even] {
        for day in Weekday::ALL {
            for lesson in schedule.bucket(parity, day) {
                f(parity, day, lesson);
            }
        }
    }
}

/// Rebuild a per-teacher [`WeekSchedule`] by scanning every group's lessons.
///
/// A lesson matches when its teacher field, raw or normalized, normalizes to
/// the requested name. Each match is cloned with its subject annotated with
/// the owning group name so the per-teacher view stays self-describing.
pub fn teacher_week_template(data: &TimetableData, teacher: &str) -> WeekSchedule {
    let wanted = normalize_teacher_name(teacher);
    let mut out = WeekSchedule::new();

    for (group, schedule) in data.groups() {
        for_each_lesson(schedule, |parity, day, lesson| {
            let Some(raw) = lesson.teacher.as_deref() else {
                return;
            };
            if raw != wanted && normalize_teacher_name(raw) != wanted {
                return;
            }
            let mut copy = lesson.clone();
            copy.subject = format!("{} ({group})", copy.subject);
            // Pin the copy to the bucket it came from; a both-weeks lesson is
            // already present in each bucket, so re-cloning via push() would
            // double it.
            copy.week_parity = Some(parity);
            out.push(day, copy);
        });
    }

    for day_list in out.odd_week.values_mut().chain(out.even_week.values_mut()) {
        day_list.sort_by(|a, b| a.start_key().cmp(b.start_key()));
    }
    out
}

/// Seven consecutive days of a teacher's schedule, resolved through the same
/// parity path as the group view.
pub fn teacher_week_schedule(
    data: &TimetableData,
    teacher: &str,
    start_date: NaiveDate,
    semester_start: NaiveDate,
) -> Vec<DaySchedule> {
    let template = teacher_week_template(data, teacher);
    week_schedule_from(&template, start_date, semester_start, None)
}
