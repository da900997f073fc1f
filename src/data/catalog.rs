//! Group catalog loading.
//!
//! The catalog is a static JSON file keyed faculty → study format → degree →
//! list of group descriptors. It is read once per batch run and never
//! mutated; each descriptor is enriched with its position in the tree and
//! with the course number derived from the admission-year digits in the
//! group code.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

/// One raw catalog entry, as stored in the file. The link key is the
/// portal's own Cyrillic field name.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupEntry {
    pub value: String,
    pub name: String,
    #[serde(rename = "ссылка")]
    pub href: String,
}

/// A catalog entry enriched with its tree context.
#[derive(Debug, Clone)]
pub struct Group {
    pub value: String,
    pub name: String,
    pub href: String,
    pub faculty: String,
    pub study_format: String,
    pub degree: String,
    /// 1-based course number, when derivable from the group code.
    pub course: Option<u8>,
}

type RawCatalog = IndexMap<String, IndexMap<String, IndexMap<String, Vec<GroupEntry>>>>;

/// Admission-year digits → course number for the current academic year.
/// Updated once a year alongside the semester-start config.
const COURSE_BY_YEAR: &[(&str, u8)] = &[
    ("25", 1),
    ("24", 2),
    ("23", 3),
    ("22", 4),
    ("21", 5),
];

static RE_YEAR_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-(\d{2})").unwrap());

/// Course number from the two admission-year digits after the dash in a
/// group code («ИС-22» → 4).
pub fn course_from_code(code: &str) -> Option<u8> {
    let caps = RE_YEAR_CODE.captures(code)?;
    let year = caps.get(1)?.as_str();
    COURSE_BY_YEAR
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(_, course)| *course)
}

/// Load and flatten the catalog, preserving file order.
pub fn load_catalog(path: &Path) -> anyhow::Result<Vec<Group>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read group catalog {}", path.display()))?;
    let tree: RawCatalog = serde_json::from_str(&raw)
        .with_context(|| format!("invalid group catalog {}", path.display()))?;

    let mut groups = Vec::new();
    for (faculty, formats) in &tree {
        for (study_format, degrees) in formats {
            for (degree, entries) in degrees {
                for entry in entries {
                    groups.push(Group {
                        value: entry.value.clone(),
                        name: entry.name.clone(),
                        href: entry.href.clone(),
                        faculty: faculty.clone(),
                        study_format: study_format.clone(),
                        degree: degree.clone(),
                        course: course_from_code(&entry.value),
                    });
                }
            }
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_derivation_from_year_code() {
        assert_eq!(course_from_code("ИС-22"), Some(4));
        assert_eq!(course_from_code("ПИ-25-1"), Some(1));
        assert_eq!(course_from_code("БЭК-23"), Some(3));
    }

    #[test]
    fn unknown_year_code_yields_none() {
        assert_eq!(course_from_code("ИС-99"), None);
        assert_eq!(course_from_code("безкода"), None);
    }

    #[test]
    fn catalog_parses_and_flattens() {
        let json = r#"
        {
          "ФИТ": {
            "Очная": {
              "Бакалавриат": [
                {"value": "ИС-22", "name": "ИС-22", "ссылка": "/timetable/is-22"},
                {"value": "ПИ-23", "name": "ПИ-23", "ссылка": "/timetable/pi-23"}
              ]
            }
          },
          "ФЭУ": {
            "Заочная": {
              "Магистратура": [
                {"value": "МЭК-24", "name": "МЭК-24", "ссылка": "/timetable/mek-24"}
              ]
            }
          }
        }"#;
        let tree: RawCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(tree.len(), 2);

        let dir = std::env::temp_dir().join("raspisanie-catalog-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("groups.json");
        std::fs::write(&path, json).unwrap();

        let groups = load_catalog(&path).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].value, "ИС-22");
        assert_eq!(groups[0].faculty, "ФИТ");
        assert_eq!(groups[0].study_format, "Очная");
        assert_eq!(groups[0].degree, "Бакалавриат");
        assert_eq!(groups[0].course, Some(4));
        assert_eq!(groups[2].faculty, "ФЭУ");
    }
}
