//! End-to-end extraction over a realistic group page: table walk, cell
//! parsing with every annotation kind, then projection and teacher
//! aggregation over the resulting snapshot tree.

use chrono::NaiveDate;
use raspisanie::data::models::{GroupPath, TimetableData, WeekParity, Weekday};
use raspisanie::parse::group::parse_group_table;
use raspisanie::schedule::project::{day_schedule, week_schedule_from};
use raspisanie::schedule::teachers::{teacher_week_schedule, TeacherIndex};

/// Monday; semester week 1 is odd.
fn semester_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
}

const GROUP_PAGE: &str = r#"
<html><body>
<h2>Расписание группы ИС-22</h2>
<table class="timetable">
  <tr><td class="day-header" colspan="3">Понедельник</td></tr>
  <tr>
    <td>8:30 - 10:00</td>
    <td><sup>*</sup>Б-303 Информатика (лб) (1 - 16 нед.)<br>доц. Андреева А. А. <i>2 подгруппа</i></td>
  </tr>
  <tr>
    <td>8:30 - 10:00</td>
    <td><sup>*</sup>Б-304 Информатика (лб) (1 - 16 нед.)<br>Аринина Н. Н. (ДОТ) <i>1 подгруппа</i></td>
  </tr>
  <tr>
    <td>10:10 - 11:40</td>
    <td>А-101 <span style="color: #0066cc">Математический анализ</span> (лк)<br>проф. д.т.н. Смирнов С. С.</td>
  </tr>
  <tr><td class="day-header" colspan="3">Вторник</td></tr>
  <tr>
    <td>12:10 - 13:40</td>
    <td><sup>**</sup>Дистанционно Иностранный язык (пр)<br>Кузнецова М. В.</td>
  </tr>
  <tr>
    <td>14:00 - 15:30</td>
    <td>Б-303 Физика (лк) (1 - 8 нед.)<br>Иванов И. И.
      <div style="border: 1px solid #cc0000">14.10.2025 Преподаватель: Петров П. П., замена занятия</div>
    </td>
  </tr>
  <tr><td class="day-header" colspan="3">Среда</td></tr>
  <tr>
    <td>8:30 - 10:00</td>
    <td></td>
  </tr>
</table>
</body></html>"#;

fn snapshot() -> TimetableData {
    let schedule = parse_group_table(GROUP_PAGE, semester_start());
    let mut data = TimetableData::default();
    data.insert(
        &GroupPath {
            institution: "Университет".into(),
            faculty: "ФИТ".into(),
            study_format: "Очная".into(),
            degree: "Бакалавриат".into(),
            group: "ИС-22".into(),
        },
        schedule,
    );
    data
}

#[test]
fn extracts_all_annotated_lessons() {
    let data = snapshot();
    let schedule = data.find_group("ИС-22").unwrap();

    // Monday odd bucket: two subgroup labs plus the every-week lecture.
    let monday = schedule.bucket(WeekParity::Odd, Weekday::Monday);
    assert_eq!(monday.len(), 3);

    let lab = &monday[0];
    assert_eq!(lab.room, "Б-303");
    assert_eq!(lab.subject, "Информатика");
    assert_eq!(lab.lesson_type.as_deref(), Some("лб"));
    assert_eq!(lab.subgroup, Some(2));
    assert_eq!(lab.week_parity, Some(WeekParity::Odd));
    assert_eq!(lab.weeks.as_deref(), Some(&[1, 3, 5, 7, 9, 11, 13, 15][..]));

    // Colored span beats positional subject extraction.
    let lecture = &monday[2];
    assert_eq!(lecture.subject, "Математический анализ");
    assert_eq!(lecture.teacher.as_deref(), Some("проф. д.т.н. Смирнов С. С."));

    // Monday even bucket only carries the every-week lecture.
    assert_eq!(schedule.bucket(WeekParity::Even, Weekday::Monday).len(), 1);

    // Tuesday: the remote class sits in the even bucket only.
    let tuesday_even = schedule.bucket(WeekParity::Even, Weekday::Tuesday);
    assert!(tuesday_even.iter().any(|l| l.room == "Дистанционно"));
    assert!(
        schedule
            .bucket(WeekParity::Odd, Weekday::Tuesday)
            .iter()
            .all(|l| l.room != "Дистанционно")
    );

    // Wednesday stayed empty but the key exists.
    assert!(schedule.bucket(WeekParity::Odd, Weekday::Wednesday).is_empty());
}

#[test]
fn substitution_excludes_its_week_from_the_regular_set() {
    let data = snapshot();
    let schedule = data.find_group("ИС-22").unwrap();

    let physics = schedule
        .bucket(WeekParity::Odd, Weekday::Tuesday)
        .iter()
        .find(|l| l.subject == "Физика")
        .unwrap();

    assert_eq!(physics.substitutions.len(), 1);
    let sub = &physics.substitutions[0];
    assert_eq!(sub.date, NaiveDate::from_ymd_opt(2025, 10, 14).unwrap());
    assert_eq!(sub.teacher.as_deref(), Some("Петров П. П."));

    // 14.10.2025 is semester week 7; it disappears from the 1..=8 range.
    assert_eq!(physics.weeks.as_deref(), Some(&[1, 2, 3, 4, 5, 6, 8][..]));
    // The regular teacher is unaffected by the override block.
    assert_eq!(physics.teacher.as_deref(), Some("Иванов И. И."));
}

#[test]
fn day_projection_filters_subgroup_and_sorts() {
    let data = snapshot();
    let schedule = data.find_group("ИС-22").unwrap();

    // 2025-09-01: odd-week Monday.
    let day = day_schedule(schedule, semester_start(), semester_start(), Some(1));
    assert_eq!(day.day_of_week, "Понедельник");
    assert_eq!(day.lessons.len(), 2, "subgroup 2 lab filtered out");
    assert!(day.lessons.iter().all(|l| l.subgroup.is_none() || l.subgroup == Some(1)));

    let times: Vec<&str> = day.lessons.iter().map(|l| l.time.as_str()).collect();
    assert_eq!(times, ["08:30–10:00", "10:10–11:40"]);
}

#[test]
fn week_projection_alternates_parity() {
    let data = snapshot();
    let schedule = data.find_group("ИС-22").unwrap();

    let week = week_schedule_from(schedule, semester_start(), semester_start(), None);
    assert_eq!(week.len(), 7);

    // Odd-week Tuesday: only the physics lecture, no remote class.
    let tuesday = &week[1];
    assert_eq!(tuesday.day_of_week, "Вторник");
    assert_eq!(tuesday.lessons.len(), 1);
    assert_eq!(tuesday.lessons[0].subject, "Физика");

    // Next week's Tuesday is even: remote class appears.
    let next_week = week_schedule_from(
        schedule,
        semester_start() + chrono::Days::new(7),
        semester_start(),
        None,
    );
    assert!(next_week[1].lessons.iter().any(|l| l.room == "Дистанционно"));
}

#[test]
fn teacher_index_normalizes_titles_from_scraped_page() {
    let data = snapshot();
    let index = TeacherIndex::build(&data);
    let names = index.names();

    assert!(names.contains(&"Андреева А. А.".to_string()));
    assert!(names.contains(&"Смирнов С. С.".to_string()), "titles stripped");
    assert!(names.contains(&"Аринина Н. Н.".to_string()), "remote marker stripped");
    assert!(!names.iter().any(|n| n.contains("доц.")));
    assert!(!names.iter().any(|n| n.contains("(ДОТ)")));
}

#[test]
fn teacher_week_view_annotates_group_and_follows_parity() {
    let data = snapshot();

    // Андреева teaches exactly one odd-week Monday slot.
    let days = teacher_week_schedule(&data, "Андреева А. А.", semester_start(), semester_start());
    assert_eq!(days.len(), 7);

    let nonempty: Vec<_> = days.iter().filter(|d| !d.lessons.is_empty()).collect();
    assert_eq!(nonempty.len(), 1);
    assert_eq!(nonempty[0].day_of_week, "Понедельник");
    assert_eq!(nonempty[0].lessons[0].subject, "Информатика (ИС-22)");

    // On an even week she has no lessons at all.
    let even_days = teacher_week_schedule(
        &data,
        "Андреева А. А.",
        semester_start() + chrono::Days::new(7),
        semester_start(),
    );
    assert!(even_days.iter().all(|d| d.lessons.is_empty()));
}

#[test]
fn snapshot_json_round_trips_through_versioned_store() {
    let data = snapshot();
    let json = serde_json::to_string(&data).unwrap();
    let back: TimetableData = serde_json::from_str(&json).unwrap();
    assert_eq!(back, data);
    assert_eq!(back.group_count(), 1);
}
