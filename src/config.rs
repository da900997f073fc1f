//! Application configuration, merged from a TOML file and environment
//! variables (`RASP_*`), in that order of precedence.

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of the university portal, e.g. `https://portal.example.ru`.
    pub portal_base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Portal credentials. Only required for `scrape`; query commands work
    /// without them.
    #[serde(default)]
    pub portal_username: String,
    #[serde(default)]
    pub portal_password: String,

    /// First day of the semester (ISO date). Authoritative for all parity
    /// math; a wrong value shifts the whole semester's parity by one week
    /// and is not detectable from inside.
    pub semester_start: NaiveDate,

    /// Top-level key the scraped tree is filed under, and the institution
    /// legacy snapshots migrate into.
    #[serde(default = "default_institution")]
    pub institution: String,

    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Where unparseable group pages are persisted for manual inspection.
    #[serde(default = "default_debug_pages_dir")]
    pub debug_pages_dir: PathBuf,

    /// Minimum spacing between portal requests. Rate limiting, not
    /// concurrency control: the fetch loop is strictly sequential.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_institution() -> String {
    "Университет".to_string()
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/groups.json")
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/timetable.json")
}

fn default_debug_pages_dir() -> PathBuf {
    PathBuf::from("data/debug-pages")
}

fn default_request_delay_ms() -> u64 {
    1500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Figment::new()
            .merge(Toml::file("raspisanie.toml"))
            .merge(Env::prefixed("RASP_"))
            .extract()
            .context("failed to load config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn minimal_config_fills_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "raspisanie.toml",
                r#"
                    portal_base_url = "https://portal.example.ru"
                    semester_start = "2025-09-01"
                "#,
            )?;
            let config = Config::load().unwrap();
            assert_eq!(config.login_path, "/login");
            assert_eq!(config.request_delay_ms, 1500);
            assert_eq!(config.log_level, "info");
            assert_eq!(
                config.semester_start,
                NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
            );
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "raspisanie.toml",
                r#"
                    portal_base_url = "https://portal.example.ru"
                    semester_start = "2025-09-01"
                    request_delay_ms = 500
                "#,
            )?;
            jail.set_env("RASP_REQUEST_DELAY_MS", "2500");
            let config = Config::load().unwrap();
            assert_eq!(config.request_delay_ms, 2500);
            Ok(())
        });
    }
}
