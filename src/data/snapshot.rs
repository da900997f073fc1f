//! Versioned snapshot persistence.
//!
//! The snapshot file is the sole interface between the scraper and all
//! serving code. It is written exactly once per successful batch run,
//! atomically (temp file + rename), so readers never observe a partial
//! write. Loading accepts both the current versioned shape and the legacy
//! faculty-keyed shape; the legacy shape is migrated in one adapter step at
//! load time rather than branched on at every read site.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::models::{FacultyMap, TimetableData};

/// Bumped when the on-disk shape changes; loading handles older shapes.
const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
struct VersionedSnapshot {
    version: u32,
    #[serde(flatten)]
    data: TimetableData,
}

/// Either the current versioned shape or the legacy tree keyed directly by
/// faculty (no version marker, no institution level).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnySnapshot {
    Current(VersionedSnapshot),
    Legacy(FacultyMap),
}

/// Parse snapshot JSON, migrating the legacy shape under `institution`.
pub fn from_json(raw: &str, institution: &str) -> anyhow::Result<TimetableData> {
    match serde_json::from_str::<AnySnapshot>(raw).context("unrecognized snapshot shape")? {
        AnySnapshot::Current(snapshot) => Ok(snapshot.data),
        AnySnapshot::Legacy(faculties) => {
            info!(institution, "migrating legacy faculty-keyed snapshot");
            let mut data = TimetableData::default();
            data.institutions.insert(institution.to_string(), faculties);
            Ok(data)
        }
    }
}

pub fn load(path: &Path, institution: &str) -> anyhow::Result<TimetableData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read snapshot {}", path.display()))?;
    from_json(&raw, institution)
}

/// Serialize fully, write to a sibling temp file, then rename over the
/// target so a crash mid-write leaves the previous snapshot in place.
pub fn save(path: &Path, data: &TimetableData) -> anyhow::Result<()> {
    let snapshot = VersionedSnapshot {
        version: SNAPSHOT_VERSION,
        data: data.clone(),
    };
    let json = serde_json::to_string_pretty(&snapshot).context("cannot serialize snapshot")?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("cannot write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("cannot move snapshot into place at {}", path.display()))?;
    Ok(())
}
