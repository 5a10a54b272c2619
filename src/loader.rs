//! Bulk loader for the benchmark archive.
//!
//! The archive is a zip of JSON files, each holding a top-level object with
//! any of `users`, `locations`, `visits` as arrays. Files are imported
//! grouped by entity category — users first, then locations, then visits —
//! because visit rows are validated against already-present users and
//! locations. The loader runs to completion before the server accepts
//! traffic, so it takes no special locking beyond the engine's own.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::time::Instant;

use serde::Deserialize;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::model::{Location, User, Visit};
use crate::travels::TravelDb;

/// Totals across the whole archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub users: usize,
    pub locations: usize,
    pub visits: usize,
    /// Rows rejected by the engine (duplicate ids, dangling visit
    /// references and the like).
    pub skipped: usize,
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveFile {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default)]
    visits: Vec<Visit>,
}

/// Import order of an archive entry, derived from its file name. Unrecognized
/// names import last; their per-file arrays still load in dependency order.
fn category_rank(name: &str) -> u8 {
    let base = name.rsplit('/').next().unwrap_or(name);
    if base.starts_with("users") {
        0
    } else if base.starts_with("locations") {
        1
    } else if base.starts_with("visits") {
        2
    } else {
        3
    }
}

/// Load the archive at `path` into `db`. A missing archive is not an error:
/// the service starts empty.
pub fn load_archive(db: &TravelDb, path: &Path) -> Result<LoadSummary> {
    if !path.exists() {
        tracing::info!("no archive at {}, starting empty", path.display());
        return Ok(LoadSummary::default());
    }
    tracing::info!("loading archive {}", path.display());
    let file = File::open(path)?;
    load_from_reader(db, BufReader::new(file))
}

/// Load an archive from any seekable byte source.
pub fn load_from_reader<R: Read + Seek>(db: &TravelDb, reader: R) -> Result<LoadSummary> {
    let start = Instant::now();
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| Error::Internal(format!("failed to open archive: {}", e)))?;

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| name.ends_with(".json"))
        .map(String::from)
        .collect();
    names.sort_by_key(|name| category_rank(name));

    let mut summary = LoadSummary::default();
    let mut buf = String::new();
    for name in &names {
        tracing::info!("processing {}", name);
        buf.clear();
        let mut entry = match archive.by_name(name) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("failed to open {}: {}", name, err);
                continue;
            }
        };
        if let Err(err) = entry.read_to_string(&mut buf) {
            tracing::warn!("failed to read {}: {}", name, err);
            continue;
        }
        let data: ArchiveFile = match serde_json::from_str(&buf) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!("failed to decode {}: {}", name, err);
                continue;
            }
        };

        if !data.users.is_empty() {
            tracing::info!("importing {} users", data.users.len());
            let outcome = db.create_users(data.users);
            summary.users += outcome.created;
            summary.skipped += outcome.skipped;
        }
        if !data.locations.is_empty() {
            tracing::info!("importing {} locations", data.locations.len());
            let outcome = db.create_locations(data.locations);
            summary.locations += outcome.created;
            summary.skipped += outcome.skipped;
        }
        if !data.visits.is_empty() {
            tracing::info!("importing {} visits", data.visits.len());
            let outcome = db.create_visits(data.visits);
            summary.visits += outcome.created;
            summary.skipped += outcome.skipped;
        }
    }

    tracing::info!(
        "loaded {} users, {} locations, {} visits ({} skipped) in {:?}",
        summary.users,
        summary.locations,
        summary.visits,
        summary.skipped,
        start.elapsed()
    );
    Ok(summary)
}
