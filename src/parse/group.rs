//! Full group-page extraction: walk the weekly table row by row, tracking the
//! current day and time slot, and feed every occupied cell through the cell
//! parser.

use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use html_scraper::{ElementRef, Html, Selector};
use regex::Regex;
use tracing::{debug, warn};

use crate::data::catalog::Group;
use crate::data::models::{Weekday, WeekSchedule};
use crate::parse::cell::parse_lesson_cell;
use crate::portal::{PortalClient, PortalError};

/// Body fragments that mark a "no schedule for this group" page even when it
/// comes back with HTTP 200.
const ERROR_MARKERS: &[&str] = &[
    "Страница не найдена",
    "Произошла ошибка",
    "Расписание не найдено",
];

static SEL_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table tr").unwrap());
static SEL_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static RE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})\s*[–—-]\s*(\d{1,2}):(\d{2})$").unwrap());

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A row is a day separator when one of its cells is exactly a weekday label.
fn day_separator(row: ElementRef) -> Option<Weekday> {
    row.select(&SEL_CELL).find_map(|cell| Weekday::from_label(&cell_text(cell)))
}

/// Normalize a slot time to the canonical zero-padded "HH:MM–HH:MM" form the
/// projection code sorts on.
fn normalize_time(raw: &str) -> Option<String> {
    let caps = RE_TIME.captures(raw.trim())?;
    let h1: u8 = caps[1].parse().ok()?;
    let h2: u8 = caps[3].parse().ok()?;
    Some(format!("{h1:02}:{}–{h2:02}:{}", &caps[2], &caps[4]))
}

/// Walk the primary lesson table of an already-fetched page.
///
/// Row-scoped state: `current_day` resets on day-separator rows,
/// `current_time` on rows whose first cell is a time range. Occupied cells
/// are parsed only while both are set; a cell the parser rejects is skipped
/// without aborting the walk.
pub fn parse_group_table(html: &str, semester_start: NaiveDate) -> WeekSchedule {
    let document = Html::parse_document(html);
    let mut schedule = WeekSchedule::new();

    let mut current_day: Option<Weekday> = None;
    let mut current_time: Option<String> = None;

    for row in document.select(&SEL_ROW) {
        if let Some(day) = day_separator(row) {
            current_day = Some(day);
            current_time = None;
            continue;
        }

        let mut cells = row.select(&SEL_CELL).peekable();
        let Some(first) = cells.peek().copied() else {
            continue;
        };
        if let Some(time) = normalize_time(&cell_text(first)) {
            current_time = Some(time);
            cells.next();
        }

        let (Some(day), Some(time)) = (current_day, current_time.as_deref()) else {
            continue;
        };

        for cell in cells {
            if cell_text(cell).is_empty() {
                continue;
            }
            if let Some(lesson) = parse_lesson_cell(&cell.inner_html(), time, semester_start) {
                schedule.push(day, lesson);
            }
        }
    }

    schedule
}

fn dump_debug_page(debug_dir: &Path, group: &Group, body: &str) {
    let file = debug_dir.join(format!("{}.html", group.value.replace(['/', '\\'], "_")));
    let result = std::fs::create_dir_all(debug_dir).and_then(|()| std::fs::write(&file, body));
    match result {
        Ok(()) => warn!(group = %group.value, page = %file.display(), "unparseable page persisted for inspection"),
        Err(e) => warn!(group = %group.value, error = %e, "failed to persist unparseable page"),
    }
}

/// Fetch and parse one group's timetable.
///
/// `Ok(None)` covers every expected "no data" case: HTTP 404/5xx, known
/// error-page markers, and pages where the primary table yields zero lessons
/// (those are persisted to the debug directory instead of guessed at). A
/// single group's absence must never abort the batch; only transport errors
/// propagate.
pub async fn fetch_group_timetable(
    client: &PortalClient,
    group: &Group,
    semester_start: NaiveDate,
    debug_dir: &Path,
) -> Result<Option<WeekSchedule>, PortalError> {
    let page = client.get_page(&group.href).await?;

    if page.status.as_u16() == 404 || page.status.is_server_error() {
        debug!(group = %group.value, status = page.status.as_u16(), "no timetable page");
        return Ok(None);
    }
    if ERROR_MARKERS.iter().any(|marker| page.body.contains(marker)) {
        debug!(group = %group.value, "error marker on timetable page");
        return Ok(None);
    }

    let schedule = parse_group_table(&page.body, semester_start);
    if schedule.lesson_count() == 0 {
        // Either the primary table structure is absent or nothing inside it
        // parsed; keep the raw page around rather than guessing at an
        // alternate structure.
        dump_debug_page(debug_dir, group, &page.body);
        return Ok(None);
    }

    Ok(Some(schedule))
}
