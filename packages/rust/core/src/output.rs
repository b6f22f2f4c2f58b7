//! Record output: one JSON file per record, or one JSON array.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use drivedocs_shared::{DriveDocsError, Record, Result};

/// Serialize a whole batch as a pretty-printed JSON array.
pub fn records_to_json(records: &[Record]) -> Result<String> {
    serde_json::to_string_pretty(records)
        .map_err(|e| DriveDocsError::validation(format!("JSON serialization failed: {e}")))
}

/// Write each record to `<dir>/<title>.json`.
///
/// Titles that collide (case-insensitively) get ` (2)`, ` (3)`, ... appended.
/// Returns the written paths in record order.
#[instrument(skip_all, fields(dir = %dir.display(), records = records.len()))]
pub fn write_records(dir: &Path, records: &[Record]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| DriveDocsError::io(dir, e))?;

    let mut taken: HashSet<String> = HashSet::new();
    let mut written = Vec::with_capacity(records.len());

    for record in records {
        let stem = unique_stem(&record.title, &mut taken);
        let path = dir.join(format!("{stem}.json"));
        write_json(&path, record)?;
        written.push(path);
    }

    info!(count = written.len(), "records written");
    Ok(written)
}

fn unique_stem(title: &str, taken: &mut HashSet<String>) -> String {
    let mut stem = title.to_string();
    let mut n = 1;
    while !taken.insert(stem.to_lowercase()) {
        n += 1;
        stem = format!("{title} ({n})");
    }
    stem
}

/// Write a JSON file (pretty-printed) via a temp file and rename.
fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| DriveDocsError::validation(format!("JSON serialization failed: {e}")))?;

    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, json).map_err(|e| DriveDocsError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| DriveDocsError::io(path, e))?;

    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}
