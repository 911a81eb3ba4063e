use crate::domain::error::VaultError;
use crate::domain::models::{OperationKind, OperationRecord, Outcome};
use crate::services::lockmap;
use crate::services::project::Project;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::PathBuf;

const OPLOG_FILE: &str = "oplog.jsonl";

pub fn log_path(project: &Project) -> PathBuf {
    project.vault_dir().join(OPLOG_FILE)
}

pub fn record(
    kind: OperationKind,
    path: &str,
    outcome: Outcome,
    reason: Option<String>,
    snapshot_version: Option<u64>,
) -> OperationRecord {
    OperationRecord {
        kind,
        path: path.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        outcome,
        reason,
        snapshot_version,
    }
}

/// Durable, ordered append. Records are one JSON object per line; nothing is
/// ever rewritten in place, so concurrent readers never see a torn log.
pub fn append(project: &Project, record: &OperationRecord) -> Result<(), VaultError> {
    let lock = lockmap::root_lock(project.root());
    let _guard = lockmap::acquire(&lock);
    append_unlocked(project, record)
}

/// Caller must hold the project root lock.
pub(crate) fn append_unlocked(
    project: &Project,
    record: &OperationRecord,
) -> Result<(), VaultError> {
    let path = log_path(project);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| VaultError::fs(parent, err))?;
    }
    let line = serde_json::to_string(record).map_err(|err| {
        VaultError::fs(
            &path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, err),
        )
    })?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| VaultError::fs(&path, err))?;
    writeln!(file, "{}", line).map_err(|err| VaultError::fs(&path, err))?;
    file.sync_all().map_err(|err| VaultError::fs(&path, err))?;
    Ok(())
}

pub fn read_all(project: &Project) -> Result<Vec<OperationRecord>, VaultError> {
    Ok(read_numbered(project)?
        .into_iter()
        .map(|(_, record)| record)
        .collect())
}

pub fn entries_for(
    project: &Project,
    rel: Option<&str>,
) -> Result<Vec<OperationRecord>, VaultError> {
    let mut entries = read_all(project)?;
    if let Some(rel) = rel {
        entries.retain(|r| r.path == rel);
    }
    Ok(entries)
}

pub fn entries_since(
    project: &Project,
    since: &DateTime<Utc>,
) -> Result<Vec<OperationRecord>, VaultError> {
    let path = log_path(project);
    let mut out = Vec::new();
    for (line, record) in read_numbered(project)? {
        let ts = DateTime::parse_from_rfc3339(&record.timestamp).map_err(|_| {
            VaultError::LogCorrupted {
                path: path.clone(),
                line,
            }
        })?;
        if ts.with_timezone(&Utc) >= *since {
            out.push(record);
        }
    }
    Ok(out)
}

/// An unparseable line means the history is no longer trustworthy; surface
/// `LogCorrupted` instead of truncating or skipping.
fn read_numbered(project: &Project) -> Result<Vec<(usize, OperationRecord)>, VaultError> {
    let path = log_path(project);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path).map_err(|err| VaultError::fs(&path, err))?;
    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: OperationRecord =
            serde_json::from_str(line).map_err(|_| VaultError::LogCorrupted {
                path: path.clone(),
                line: idx + 1,
            })?;
        out.push((idx + 1, record));
    }
    Ok(out)
}
