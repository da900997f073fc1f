//! Single-slot lesson cell parsing.
//!
//! A cell is a small blob of irregular markup: an optional footnote-style
//! parity marker, a room code, the subject (sometimes color-tagged), a
//! parenthesized type code, week-range annotations, the teacher after a line
//! break, subgroup notes, and optionally a bordered substitution block for a
//! one-off override. Every extraction step is best-effort and independent:
//! a step that finds nothing leaves its field absent and never aborts the
//! rest of the pipeline.

use std::sync::LazyLock;

use chrono::NaiveDate;
use html_scraper::{ElementRef, Html, Selector};
use regex::Regex;
use tracing::warn;

use crate::data::models::{Lesson, Substitution, WeekParity};
use crate::schedule::parity::semester_week_number;

/// Type codes the portal actually uses; anything else in the first
/// parenthetical is part of the subject, not a type.
const LESSON_TYPES: &[&str] = &["лк", "лб", "пр", "ср", "кр", "экз", "зач"];

static SEL_SUP: LazyLock<Selector> = LazyLock::new(|| Selector::parse("sup").unwrap());
static SEL_ITALIC: LazyLock<Selector> = LazyLock::new(|| Selector::parse("i, em").unwrap());
static SEL_COLORED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span[style*=\"color\"], font[color]").unwrap());
static SEL_SUBSTITUTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "div[style*=\"border\"], span[style*=\"border\"], div[style*=\"background\"]",
    )
    .unwrap()
});

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_ROOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Дистанционно|[А-ЯЁ][а-яё]{0,2}-?\d{1,4}[а-яё]?)").unwrap());
static RE_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^()]*)\)").unwrap());
static RE_SUBGROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*подгрупп[аы]").unwrap());
static RE_WEEK_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\s*-\s*(\d{1,2})\s*нед").unwrap());
static RE_WEEK_SINGLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,2})\s*нед\.?$").unwrap());
static RE_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{2}\.\d{2}\.\d{4}").unwrap());
static RE_SUB_TEACHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Преподаватель:\s*([^,;\n]+?)\s*(?:[,;]|$)").unwrap());

/// Strip tags, decode entities, collapse whitespace.
fn plain_text(html: &str) -> String {
    let no_tags = RE_TAG.replace_all(html, " ");
    let decoded = htmlize::unescape(no_tags.as_ref());
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split the cell into its first visual line and the remainder by walking the
/// DOM: the first `<br>` at any depth switches lines, and substitution
/// subtrees are skipped entirely so override text never reaches either line,
/// however their attributes were quoted in the source markup.
fn split_cell_text(fragment: &Html) -> (String, String) {
    fn walk(
        node: ego_tree::NodeRef<'_, html_scraper::Node>,
        out: &mut [String; 2],
        line: &mut usize,
    ) {
        for child in node.children() {
            if let Some(el) = ElementRef::wrap(child) {
                if el.value().name() == "br" {
                    if *line == 0 {
                        *line = 1;
                    } else {
                        out[*line].push(' ');
                    }
                    continue;
                }
                if SEL_SUBSTITUTION.matches(&el) {
                    continue;
                }
                walk(child, out, line);
            } else if let Some(text) = child.value().as_text() {
                out[*line].push_str(text);
                out[*line].push(' ');
            }
        }
    }

    let mut out = [String::new(), String::new()];
    let mut line = 0;
    walk(*fragment.root_element(), &mut out, &mut line);
    (collapse(&out[0]), collapse(&out[1]))
}

/// Step 1: footnote asterisks in a superscript annotation. One asterisk is
/// the odd-week template, two is even, none means the lesson runs every week.
fn extract_parity(fragment: &Html, text: &str) -> Option<WeekParity> {
    let stars = match fragment.select(&SEL_SUP).next() {
        Some(sup) => sup.text().collect::<String>().matches('*').count(),
        None => text.chars().take_while(|c| *c == '*').count(),
    };
    match stars {
        1 => Some(WeekParity::Odd),
        n if n >= 2 => Some(WeekParity::Even),
        _ => None,
    }
}

/// Step 2: room code at the start of the cell, after any asterisks.
fn extract_room(first_line: &str) -> (String, usize) {
    let stripped = first_line.trim_start_matches(['*', ' ']);
    let offset = first_line.len() - stripped.len();
    match RE_ROOM.find(stripped) {
        Some(m) => (m.as_str().to_string(), offset + m.end()),
        None => (String::new(), offset),
    }
}

/// Step 3: subject, preferring a color-tagged inline span over positional
/// extraction between the room and the first parenthetical.
fn extract_subject(fragment: &Html, first_line: &str, after_room: usize) -> Option<String> {
    for span in fragment.select(&SEL_COLORED) {
        if in_substitution_block(span) {
            continue;
        }
        let text = plain_text(&span.inner_html());
        if !text.is_empty() {
            return Some(text);
        }
    }

    let tail = first_line.get(after_room..)?;
    let until_paren = match tail.find('(') {
        Some(idx) => &tail[..idx],
        None => tail,
    };
    let subject = until_paren.trim().trim_matches(',').trim().to_string();
    (!subject.is_empty()).then_some(subject)
}

fn in_substitution_block(el: ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| SEL_SUBSTITUTION.matches(&a))
}

/// Step 4: the first parenthetical is a type code only when it matches the
/// closed set; returns the matched span so the week scan can skip it.
fn extract_lesson_type(first_line: &str) -> Option<(String, (usize, usize))> {
    let caps = RE_PAREN.captures(first_line)?;
    let inner = caps.get(1)?.as_str().trim().trim_end_matches('.');
    let lowered = inner.to_lowercase();
    LESSON_TYPES
        .contains(&lowered.as_str())
        .then(|| (lowered, (caps.get(0).unwrap().start(), caps.get(0).unwrap().end())))
}

/// Step 6: an italic sub-element wins over the whole-cell fallback.
fn extract_subgroup(fragment: &Html, full_text: &str) -> Option<u8> {
    for italic in fragment.select(&SEL_ITALIC) {
        let text = plain_text(&italic.inner_html());
        if let Some(caps) = RE_SUBGROUP.captures(&text) {
            return caps[1].parse().ok();
        }
    }
    RE_SUBGROUP.captures(full_text).and_then(|caps| caps[1].parse().ok())
}

/// Step 7: explicit «A - B нед.» range, else a lone «N нед.» parenthetical
/// that wasn't already consumed as the lesson type.
fn extract_week_span(first_line: &str, type_span: Option<(usize, usize)>) -> Option<(u32, u32)> {
    if let Some(caps) = RE_WEEK_RANGE.captures(first_line) {
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        return (a <= b).then_some((a, b));
    }

    for caps in RE_PAREN.captures_iter(first_line) {
        let whole = caps.get(0).unwrap();
        if type_span.is_some_and(|(s, _)| s == whole.start()) {
            continue;
        }
        if let Some(single) = RE_WEEK_SINGLE.captures(caps[1].trim()) {
            let n: u32 = single[1].parse().ok()?;
            return Some((n, n));
        }
    }
    None
}

/// Step 8: a bordered/colored child block is a one-off override. Extracts the
/// date, the replacement teacher, and whatever text remains as the note.
fn extract_substitutions(fragment: &Html) -> Vec<Substitution> {
    let mut subs = Vec::new();
    for block in fragment.select(&SEL_SUBSTITUTION) {
        let text = plain_text(&block.inner_html());
        let Some(date_match) = RE_DATE.find(&text) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date_match.as_str(), "%d.%m.%Y") else {
            continue;
        };

        let teacher = block
            .select(&SEL_COLORED)
            .next()
            .map(|span| plain_text(&span.inner_html()))
            .filter(|t| !t.is_empty())
            .or_else(|| {
                RE_SUB_TEACHER
                    .captures(&text)
                    .map(|caps| caps[1].trim().to_string())
            });

        let mut note = text.clone();
        note = note.replace(date_match.as_str(), "");
        if let Some(caps) = RE_SUB_TEACHER.captures(&text) {
            note = note.replace(caps.get(0).unwrap().as_str(), "");
        } else if let Some(t) = &teacher {
            note = note.replace(t.as_str(), "");
        }
        let note = note.split_whitespace().collect::<Vec<_>>().join(" ");
        let note = note.trim_matches([',', ';', ' ']).to_string();

        subs.push(Substitution {
            date,
            teacher,
            note: (!note.is_empty()).then_some(note),
        });
    }
    subs
}

/// Step 9: concrete absolute week numbers for the lesson, minus any weeks a
/// substitution takes over so overridden weeks are not double-counted.
fn materialize_weeks(
    span: (u32, u32),
    parity: Option<WeekParity>,
    substitutions: &[Substitution],
    semester_start: NaiveDate,
) -> Vec<u32> {
    let (from, to) = span;
    let mut excluded: Vec<u32> = Vec::new();
    for sub in substitutions {
        let week = semester_week_number(sub.date, semester_start);
        let Ok(week) = u32::try_from(week) else {
            warn!(date = %sub.date, "substitution dated before semester start, ignoring for week math");
            continue;
        };
        if week < from || week > to {
            // Data-entry error on the portal side: the override points at a
            // week the lesson doesn't run in.
            warn!(
                date = %sub.date,
                week,
                range = format!("{from}-{to}"),
                "substitution date outside the lesson's declared week range"
            );
            continue;
        }
        excluded.push(week);
    }

    (from..=to)
        .filter(|w| parity.is_none_or(|p| p.matches_week(*w)))
        .filter(|w| !excluded.contains(w))
        .collect()
}

/// Parse one occupied slot cell into a [`Lesson`].
///
/// Returns `None` when no subject could be extracted, which guards against
/// decorative and empty cells. Malformed markup never panics or errors;
/// missing optional fields simply stay absent.
pub fn parse_lesson_cell(cell_html: &str, time: &str, semester_start: NaiveDate) -> Option<Lesson> {
    let fragment = Html::parse_fragment(cell_html);

    let substitutions = extract_substitutions(&fragment);
    let (first_line, teacher_line) = split_cell_text(&fragment);

    let full_text = collapse(&format!("{first_line} {teacher_line}"));
    let parity = extract_parity(&fragment, &full_text);
    let (room, after_room) = extract_room(&first_line);
    let subject = extract_subject(&fragment, &first_line, after_room)?;
    let lesson_type = extract_lesson_type(&first_line);
    let subgroup = extract_subgroup(&fragment, &full_text);
    let week_span = extract_week_span(&first_line, lesson_type.as_ref().map(|(_, span)| *span));

    let teacher = {
        let mut text = teacher_line;
        if let Some(range) = RE_SUBGROUP.find(&text).map(|m| m.range()) {
            text.replace_range(range, "");
        }
        let text = collapse(&text);
        let text = text.trim_matches([',', ';', ' ']).to_string();
        (!text.is_empty()).then_some(text)
    };

    let weeks =
        week_span.map(|span| materialize_weeks(span, parity, &substitutions, semester_start));

    Some(Lesson {
        time: time.to_string(),
        subject,
        room,
        teacher,
        subgroup,
        lesson_type: lesson_type.map(|(code, _)| code),
        week_parity: parity,
        weeks,
        substitutions,
    })
}
