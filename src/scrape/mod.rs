//! Batch snapshot refresh: authenticate once, fetch every catalog group
//! sequentially through the rate-limited client, and write the aggregated
//! tree as the new snapshot.

use std::time::Instant;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::data::catalog::{load_catalog, Group};
use crate::data::models::{GroupPath, TimetableData, WeekSchedule};
use crate::data::snapshot;
use crate::parse::group::fetch_group_timetable;
use crate::portal::{PortalClient, PortalError};
use crate::utils::fmt_duration;

/// Outcome counts for one batch run. Partial data is acceptable and
/// expected; the run is successful as long as a snapshot was written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub ok: usize,
    pub failed: usize,
}

/// Merge one group's fetch outcome into the tree, returning whether it
/// counted as a success. A failure never touches sibling groups' data.
fn record_outcome(
    data: &mut TimetableData,
    institution: &str,
    group: &Group,
    outcome: Result<Option<WeekSchedule>, PortalError>,
) -> bool {
    match outcome {
        Ok(Some(schedule)) => {
            debug!(group = %group.value, lessons = schedule.lesson_count(), "group scraped");
            data.insert(
                &GroupPath {
                    institution: institution.to_string(),
                    faculty: group.faculty.clone(),
                    study_format: group.study_format.clone(),
                    degree: group.degree.clone(),
                    group: group.name.clone(),
                },
                schedule,
            );
            true
        }
        Ok(None) => {
            debug!(group = %group.value, "no schedule for group");
            false
        }
        Err(e) => {
            warn!(group = %group.value, error = ?e, "group fetch failed");
            false
        }
    }
}

pub struct ScrapeRunner {
    config: Config,
    client: PortalClient,
}

impl ScrapeRunner {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = PortalClient::new(&config)?;
        Ok(ScrapeRunner { config, client })
    }

    /// Run one full batch. Auth failure aborts before any group is fetched;
    /// after that, per-group failures only affect their own count.
    pub async fn run(&self) -> anyhow::Result<ScrapeReport> {
        let start = Instant::now();

        let authenticated = self
            .client
            .authenticate(&self.config.portal_username, &self.config.portal_password)
            .await
            .context("portal authentication failed")?;
        if !authenticated {
            error!("portal rejected the configured credentials");
            anyhow::bail!("authentication rejected, aborting before any group fetch");
        }
        info!("authenticated against the portal");

        let groups = load_catalog(&self.config.catalog_path)?;
        info!(groups = groups.len(), "group catalog loaded");

        let mut data = TimetableData::default();
        let mut report = ScrapeReport::default();

        for group in &groups {
            let outcome = fetch_group_timetable(
                &self.client,
                group,
                self.config.semester_start,
                &self.config.debug_pages_dir,
            )
            .await;

            if record_outcome(&mut data, &self.config.institution, group, outcome) {
                report.ok += 1;
            } else {
                report.failed += 1;
            }
        }

        snapshot::save(&self.config.snapshot_path, &data)?;
        info!(
            ok = report.ok,
            failed = report.failed,
            groups_in_snapshot = data.group_count(),
            duration = fmt_duration(start.elapsed()),
            snapshot = %self.config.snapshot_path.display(),
            "snapshot written"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(value: &str) -> Group {
        Group {
            value: value.into(),
            name: value.into(),
            href: format!("/timetable/{value}"),
            faculty: "ФИТ".into(),
            study_format: "Очная".into(),
            degree: "Бакалавриат".into(),
            course: Some(3),
        }
    }

    #[test]
    fn failed_group_leaves_siblings_intact() {
        let mut data = TimetableData::default();

        assert!(record_outcome(
            &mut data,
            "Университет",
            &group("ИС-22"),
            Ok(Some(WeekSchedule::new())),
        ));
        assert!(!record_outcome(
            &mut data,
            "Университет",
            &group("ПИ-23"),
            Err(PortalError::RequestFailed(anyhow::anyhow!("timed out"))),
        ));
        assert!(!record_outcome(&mut data, "Университет", &group("БЭК-24"), Ok(None)));
        assert!(record_outcome(
            &mut data,
            "Университет",
            &group("МЭК-25"),
            Ok(Some(WeekSchedule::new())),
        ));

        // Failures are absent from the tree, successes untouched.
        assert_eq!(data.group_count(), 2);
        assert!(data.find_group("ИС-22").is_some());
        assert!(data.find_group("ПИ-23").is_none());
        assert!(data.find_group("МЭК-25").is_some());
    }
}
