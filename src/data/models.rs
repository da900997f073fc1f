//! Core timetable types shared by the scraper and the schedule query paths.
//!
//! Everything here is plain serde data: the scraper produces it, the snapshot
//! stores it, and the projection/aggregation code reads it back. No type in
//! this module performs I/O.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Which of the two alternating weekly templates a lesson belongs to.
///
/// The portal publishes schedules on a two-week rotation; week 1 of the
/// semester is odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekParity {
    Odd,
    Even,
}

impl WeekParity {
    /// Parity of an absolute 1-based semester week number.
    pub fn of_week_number(week: u32) -> Self {
        if week % 2 == 1 {
            WeekParity::Odd
        } else {
            WeekParity::Even
        }
    }

    pub fn matches_week(self, week: u32) -> bool {
        Self::of_week_number(week) == self
    }
}

/// Weekday keyed the way the portal labels its day-separator rows.
///
/// Serialized with the Russian labels so snapshot JSON matches what the
/// serving layer has always consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "Понедельник")]
    Monday,
    #[serde(rename = "Вторник")]
    Tuesday,
    #[serde(rename = "Среда")]
    Wednesday,
    #[serde(rename = "Четверг")]
    Thursday,
    #[serde(rename = "Пятница")]
    Friday,
    #[serde(rename = "Суббота")]
    Saturday,
    #[serde(rename = "Воскресенье")]
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Понедельник",
            Weekday::Tuesday => "Вторник",
            Weekday::Wednesday => "Среда",
            Weekday::Thursday => "Четверг",
            Weekday::Friday => "Пятница",
            Weekday::Saturday => "Суббота",
            Weekday::Sunday => "Воскресенье",
        }
    }

    /// Match a day-separator label from the portal, case-insensitively.
    pub fn from_label(s: &str) -> Option<Self> {
        let s = s.trim();
        Weekday::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(s) || caseless_cyrillic_eq(d.label(), s))
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

/// ASCII case folding doesn't cover Cyrillic; compare lowercased char-by-char.
fn caseless_cyrillic_eq(a: &str, b: &str) -> bool {
    a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}

/// Dates in snapshot JSON use the portal's `DD.MM.YYYY` convention.
pub mod dotted_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%d.%m.%Y";

    pub fn serialize<S: Serializer>(date: &NaiveDate, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(de)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(Error::custom)
    }
}

/// A one-off override of an otherwise-recurring lesson for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    #[serde(with = "dotted_date")]
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub teacher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
}

/// One scheduled occurrence within a parity template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Slot range, fixed-width zero-padded "HH:MM–HH:MM".
    pub time: String,
    pub subject: String,
    /// Empty if none parsed; «Дистанционно» is a valid room meaning remote.
    #[serde(default)]
    pub room: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub teacher: Option<String>,
    /// `None` means the lesson applies to the whole group.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub subgroup: Option<u8>,
    /// Short type code: лк/лб/пр/ср/кр/экз/зач.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lesson_type: Option<String>,
    /// `None` means the lesson occurs every week.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub week_parity: Option<WeekParity>,
    /// Absolute semester-week numbers on which the lesson occurs, when an
    /// explicit «N - M нед.» annotation was present.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weeks: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub substitutions: Vec<Substitution>,
}

impl Lesson {
    /// Lexicographic "HH:MM" prefix comparison is a correct time ordering
    /// because the format is fixed-width zero-padded.
    pub fn start_key(&self) -> &str {
        self.time.get(..5).unwrap_or(&self.time)
    }
}

/// Seven weekday buckets, every key always present.
pub type DayMap = IndexMap<Weekday, Vec<Lesson>>;

fn empty_day_map() -> DayMap {
    Weekday::ALL.into_iter().map(|d| (d, Vec::new())).collect()
}

/// The canonical two-parity template for one group (or one teacher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSchedule {
    pub odd_week: DayMap,
    pub even_week: DayMap,
}

impl Default for WeekSchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl WeekSchedule {
    pub fn new() -> Self {
        WeekSchedule {
            odd_week: empty_day_map(),
            even_week: empty_day_map(),
        }
    }

    /// Place a lesson into its parity bucket; a lesson without parity occurs
    /// every week and is materialized as two independent copies so each
    /// bucket stays self-contained.
    pub fn push(&mut self, day: Weekday, lesson: Lesson) {
        match lesson.week_parity {
            Some(WeekParity::Odd) => self.bucket_mut(WeekParity::Odd, day).push(lesson),
            Some(WeekParity::Even) => self.bucket_mut(WeekParity::Even, day).push(lesson),
            None => {
                self.bucket_mut(WeekParity::Odd, day).push(lesson.clone());
                self.bucket_mut(WeekParity::Even, day).push(lesson);
            }
        }
    }

    pub fn bucket(&self, parity: WeekParity, day: Weekday) -> &[Lesson] {
        let map = match parity {
            WeekParity::Odd => &self.odd_week,
            WeekParity::Even => &self.even_week,
        };
        map.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    fn bucket_mut(&mut self, parity: WeekParity, day: Weekday) -> &mut Vec<Lesson> {
        let map = match parity {
            WeekParity::Odd => &mut self.odd_week,
            WeekParity::Even => &mut self.even_week,
        };
        map.entry(day).or_default()
    }

    pub fn lesson_count(&self) -> usize {
        self.odd_week.values().chain(self.even_week.values()).map(Vec::len).sum()
    }
}

/// A resolved, calendar-anchored projection for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    #[serde(with = "dotted_date")]
    pub date: NaiveDate,
    /// Localized weekday label, matching [`Weekday::label`].
    pub day_of_week: String,
    pub lessons: Vec<Lesson>,
}

pub type GroupMap = IndexMap<String, WeekSchedule>;
pub type DegreeMap = IndexMap<String, GroupMap>;
pub type FormatMap = IndexMap<String, DegreeMap>;
pub type FacultyMap = IndexMap<String, FormatMap>;

/// The whole snapshot tree: institution → faculty → study format → degree →
/// group name → [`WeekSchedule`]. Produced wholesale by one scrape run,
/// read-only for every consumer until the next run replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimetableData {
    pub institutions: IndexMap<String, FacultyMap>,
}

impl TimetableData {
    /// Insert a group's schedule at its catalog-derived path, creating
    /// intermediate nodes as needed.
    pub fn insert(&mut self, path: &GroupPath, schedule: WeekSchedule) {
        self.institutions
            .entry(path.institution.clone())
            .or_default()
            .entry(path.faculty.clone())
            .or_default()
            .entry(path.study_format.clone())
            .or_default()
            .entry(path.degree.clone())
            .or_default()
            .insert(path.group.clone(), schedule);
    }

    /// Find a group's schedule by name, searching the whole tree.
    pub fn find_group(&self, group: &str) -> Option<&WeekSchedule> {
        self.groups().find(|(name, _)| *name == group).map(|(_, ws)| ws)
    }

    /// All `(group name, schedule)` pairs in insertion order. Every consumer
    /// traverses the tree through this single helper.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &WeekSchedule)> {
        self.institutions.values().flat_map(|faculties| {
            faculties.values().flat_map(|formats| {
                formats.values().flat_map(|degrees| {
                    degrees
                        .values()
                        .flat_map(|groups| groups.iter().map(|(name, ws)| (name.as_str(), ws)))
                })
            })
        })
    }

    pub fn group_count(&self) -> usize {
        self.groups().count()
    }
}

/// Where a group lives inside the snapshot tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPath {
    pub institution: String,
    pub faculty: String,
    pub study_format: String,
    pub degree: String,
    pub group: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(subject: &str, parity: Option<WeekParity>) -> Lesson {
        Lesson {
            time: "08:30–10:00".into(),
            subject: subject.into(),
            room: "Б-303".into(),
            teacher: None,
            subgroup: None,
            lesson_type: None,
            week_parity: parity,
            weeks: None,
            substitutions: Vec::new(),
        }
    }

    #[test]
    fn week_schedule_has_all_days_when_empty() {
        let ws = WeekSchedule::new();
        assert_eq!(ws.odd_week.len(), 7);
        assert_eq!(ws.even_week.len(), 7);
        assert!(ws.odd_week.values().all(Vec::is_empty));
    }

    #[test]
    fn all_days_survive_serialization() {
        let json = serde_json::to_string(&WeekSchedule::new()).unwrap();
        let back: WeekSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back.odd_week.len(), 7);
        assert!(json.contains("Воскресенье"));
    }

    #[test]
    fn parity_lesson_lands_in_one_bucket() {
        let mut ws = WeekSchedule::new();
        ws.push(Weekday::Tuesday, lesson("Физика", Some(WeekParity::Odd)));
        assert_eq!(ws.bucket(WeekParity::Odd, Weekday::Tuesday).len(), 1);
        assert!(ws.bucket(WeekParity::Even, Weekday::Tuesday).is_empty());
    }

    #[test]
    fn both_weeks_lesson_is_cloned_into_each_bucket() {
        let mut ws = WeekSchedule::new();
        ws.push(Weekday::Monday, lesson("Информатика", None));
        assert_eq!(ws.bucket(WeekParity::Odd, Weekday::Monday).len(), 1);
        assert_eq!(ws.bucket(WeekParity::Even, Weekday::Monday).len(), 1);

        // The copies must be independent values.
        ws.odd_week.get_mut(&Weekday::Monday).unwrap()[0].room = "Дистанционно".into();
        assert_eq!(ws.bucket(WeekParity::Odd, Weekday::Monday)[0].room, "Дистанционно");
        assert_eq!(ws.bucket(WeekParity::Even, Weekday::Monday)[0].room, "Б-303");
    }

    #[test]
    fn weekday_from_label_is_case_insensitive() {
        assert_eq!(Weekday::from_label("ПОНЕДЕЛЬНИК"), Some(Weekday::Monday));
        assert_eq!(Weekday::from_label(" суббота "), Some(Weekday::Saturday));
        assert_eq!(Weekday::from_label("не день"), None);
    }

    #[test]
    fn parity_of_week_number() {
        assert_eq!(WeekParity::of_week_number(1), WeekParity::Odd);
        assert_eq!(WeekParity::of_week_number(2), WeekParity::Even);
        assert!(WeekParity::Odd.matches_week(15));
        assert!(!WeekParity::Odd.matches_week(16));
    }

    #[test]
    fn substitution_dates_round_trip_in_dotted_format() {
        let sub = Substitution {
            date: NaiveDate::from_ymd_opt(2025, 10, 14).unwrap(),
            teacher: Some("Петров П. П.".into()),
            note: None,
        };
        let json = serde_json::to_string(&sub).unwrap();
        assert!(json.contains("14.10.2025"));
        assert_eq!(serde_json::from_str::<Substitution>(&json).unwrap(), sub);
    }

    #[test]
    fn optional_lesson_fields_are_omitted() {
        let json = serde_json::to_string(&lesson("Химия", None)).unwrap();
        assert!(!json.contains("teacher"));
        assert!(!json.contains("weekParity"));
        assert!(!json.contains("substitutions"));
    }

    #[test]
    fn tree_insert_and_find() {
        let mut data = TimetableData::default();
        let path = GroupPath {
            institution: "Университет".into(),
            faculty: "ФИТ".into(),
            study_format: "Очная".into(),
            degree: "Бакалавриат".into(),
            group: "ИС-22".into(),
        };
        data.insert(&path, WeekSchedule::new());
        assert!(data.find_group("ИС-22").is_some());
        assert!(data.find_group("ИС-99").is_none());
        assert_eq!(data.group_count(), 1);
    }
}
