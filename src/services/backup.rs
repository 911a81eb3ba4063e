use crate::domain::error::VaultError;
use crate::domain::models::{
    BulkFailure, BulkReport, OperationKind, OperationRecord, Outcome, Snapshot, WriteReceipt,
};
use crate::services::project::{self, Project};
use crate::services::{lockmap, oplog};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

const SNAPSHOT_DIR: &str = "snapshots";
const META_SUFFIX: &str = ".meta.json";

/// Snapshots the current content of one live file. Idempotent: if the latest
/// snapshot for the path already carries the same fingerprint it is returned
/// as-is and no new version is created. The attempt is recorded in the
/// operation log either way.
pub fn snapshot(project: &Project, rel: &str) -> Result<Snapshot, VaultError> {
    let lock = lockmap::root_lock(project.root());
    let _guard = lockmap::acquire(&lock);
    let result = snapshot_unlocked(project, rel);
    finish(project, OperationKind::Snapshot, rel, result)
}

/// Copies a snapshot's bytes back to the live path. The restored version is
/// recorded as a `restore` operation; newer snapshots are never deleted, so
/// a restore is itself reversible.
pub fn restore(project: &Project, rel: &str, version: u64) -> Result<Snapshot, VaultError> {
    let lock = lockmap::root_lock(project.root());
    let _guard = lockmap::acquire(&lock);
    let result = restore_unlocked(project, rel, version);
    finish(project, OperationKind::Restore, rel, result)
}

/// The editor-save path: snapshot the old content (when the file exists),
/// write the new bytes atomically, record the mutation.
pub fn write_file(project: &Project, rel: &str, bytes: &[u8]) -> Result<WriteReceipt, VaultError> {
    let lock = lockmap::root_lock(project.root());
    let _guard = lockmap::acquire(&lock);
    match write_unlocked(project, rel, bytes) {
        Ok(receipt) => {
            let rec = oplog::record(
                receipt.kind,
                rel,
                Outcome::Ok,
                None,
                receipt.snapshot_version,
            );
            oplog::append_unlocked(project, &rec)?;
            Ok(receipt)
        }
        Err((kind, err)) => {
            record_failure(project, kind, rel, &err);
            Err(err)
        }
    }
}

/// Snapshots every live resource file once, continuing past individual
/// failures. A cooperative stop request ends the pass early; everything
/// already snapshotted stays valid and is returned.
pub fn snapshot_all(
    project: &Project,
    stop: Option<&AtomicBool>,
) -> Result<BulkReport, VaultError> {
    let files = project::list_resource_files(project, None)?;
    let lock = lockmap::root_lock(project.root());
    let _guard = lockmap::acquire(&lock);

    let mut snapshots = Vec::new();
    let mut failures = Vec::new();
    let mut stopped_early = false;
    for file in files {
        if stop.map(|s| s.load(Ordering::Relaxed)).unwrap_or(false) {
            stopped_early = true;
            break;
        }
        let result = snapshot_unlocked(project, &file.path);
        let rec = match &result {
            Ok(snap) => oplog::record(
                OperationKind::Snapshot,
                &file.path,
                Outcome::Ok,
                None,
                Some(snap.version),
            ),
            Err(err) => oplog::record(
                OperationKind::Snapshot,
                &file.path,
                Outcome::Failed,
                Some(err.to_string()),
                None,
            ),
        };
        if let Err(log_err) = oplog::append_unlocked(project, &rec) {
            log::warn!("operation log append failed for {}: {log_err}", file.path);
        }
        match result {
            Ok(snap) => snapshots.push(snap),
            Err(err) => failures.push(BulkFailure {
                path: file.path,
                error: err.to_string(),
            }),
        }
    }
    log::info!(
        "snapshot-all: {} ok, {} failed{}",
        snapshots.len(),
        failures.len(),
        if stopped_early { ", stopped early" } else { "" }
    );
    Ok(BulkReport {
        snapshots,
        failures,
        stopped_early,
    })
}

/// Snapshot history of one path, newest first. Rebuilt purely from the
/// snapshot store's directory listing; an empty history is not an error.
pub fn history(project: &Project, rel: &str) -> Result<Vec<Snapshot>, VaultError> {
    project.live_path(rel)?;
    let dir = snapshot_dir(project, rel);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut versions = Vec::new();
    for entry in std::fs::read_dir(&dir).map_err(|err| VaultError::fs(&dir, err))? {
        let entry = entry.map_err(|err| VaultError::fs(&dir, err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Ok(version) = name.parse::<u64>() {
            versions.push(version);
        }
    }
    versions.sort_unstable();
    let mut out = Vec::with_capacity(versions.len());
    for version in versions {
        out.push(load_snapshot_meta(rel, &dir, version)?);
    }
    out.reverse();
    Ok(out)
}

/// Every snapshot held for the project, sorted by path then newest first.
pub fn list_all(project: &Project) -> Result<Vec<Snapshot>, VaultError> {
    let base = project.vault_dir().join(SNAPSHOT_DIR);
    if !base.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(&base).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| base.clone());
            let source = err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk error"));
            VaultError::Filesystem { path, source }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let version = match name.parse::<u64>() {
            Ok(version) => version,
            // Skips metadata sidecars and any crash-leftover temp files.
            Err(_) => continue,
        };
        let parent = match entry.path().parent() {
            Some(parent) => parent.to_path_buf(),
            None => continue,
        };
        let rel = match parent.strip_prefix(&base) {
            Ok(rel) => rel
                .iter()
                .map(|part| part.to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => continue,
        };
        out.push(load_snapshot_meta(&rel, &parent, version)?);
    }
    out.sort_by(|a, b| a.path.cmp(&b.path).then(b.version.cmp(&a.version)));
    Ok(out)
}

/// Drops old versions of one path, keeping the newest `keep`. Retention is
/// otherwise unbounded; this is the only way snapshots ever disappear.
pub fn prune(project: &Project, rel: &str, keep: usize) -> Result<usize, VaultError> {
    let lock = lockmap::root_lock(project.root());
    let _guard = lockmap::acquire(&lock);
    match prune_unlocked(project, rel, keep) {
        Ok(removed) => {
            let rec = oplog::record(
                OperationKind::Prune,
                rel,
                Outcome::Ok,
                Some(format!("removed {removed} snapshot versions")),
                None,
            );
            oplog::append_unlocked(project, &rec)?;
            Ok(removed)
        }
        Err(err) => {
            record_failure(project, OperationKind::Prune, rel, &err);
            Err(err)
        }
    }
}

fn snapshot_unlocked(project: &Project, rel: &str) -> Result<Snapshot, VaultError> {
    let live = project.live_path(rel)?;
    if !live.is_file() {
        return Err(VaultError::SourceMissing {
            path: rel.to_string(),
        });
    }
    let bytes = std::fs::read(&live).map_err(|err| VaultError::fs(&live, err))?;
    let digest = fingerprint(&bytes);
    let prior = history(project, rel)?;
    if let Some(latest) = prior.first() {
        if latest.fingerprint == digest {
            log::debug!(
                "snapshot no-op for {rel}: content unchanged since v{}",
                latest.version
            );
            return Ok(latest.clone());
        }
    }
    let version = prior.first().map(|s| s.version + 1).unwrap_or(1);
    let dir = snapshot_dir(project, rel);
    std::fs::create_dir_all(&dir).map_err(|err| VaultError::fs(&dir, err))?;
    write_atomic(&dir.join(version.to_string()), &bytes)?;
    let snap = Snapshot {
        path: rel.to_string(),
        version,
        timestamp: Utc::now().to_rfc3339(),
        fingerprint: digest,
        size: bytes.len() as u64,
    };
    let meta_path = dir.join(format!("{version}{META_SUFFIX}"));
    let meta = serde_json::to_string_pretty(&snap).map_err(|err| {
        VaultError::fs(
            &meta_path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, err),
        )
    })?;
    write_atomic(&meta_path, meta.as_bytes())?;
    log::info!("snapshot {rel} v{version} ({} bytes)", snap.size);
    Ok(snap)
}

fn restore_unlocked(project: &Project, rel: &str, version: u64) -> Result<Snapshot, VaultError> {
    let live = project.live_path(rel)?;
    let dir = snapshot_dir(project, rel);
    let data = dir.join(version.to_string());
    if !data.is_file() {
        return Err(VaultError::VersionNotFound {
            path: rel.to_string(),
            version,
        });
    }
    let bytes = std::fs::read(&data).map_err(|err| VaultError::fs(&data, err))?;
    if let Some(parent) = live.parent() {
        std::fs::create_dir_all(parent).map_err(|err| VaultError::fs(parent, err))?;
    }
    write_atomic(&live, &bytes)?;
    log::info!("restored {rel} to v{version}");
    load_snapshot_meta(rel, &dir, version)
}

fn write_unlocked(
    project: &Project,
    rel: &str,
    bytes: &[u8],
) -> Result<WriteReceipt, (OperationKind, VaultError)> {
    let live = project
        .live_path(rel)
        .map_err(|err| (OperationKind::Modify, err))?;
    let exists = live.is_file();
    let kind = if exists {
        OperationKind::Modify
    } else {
        OperationKind::Create
    };
    let snapshot_version = if exists {
        let snap = snapshot_unlocked(project, rel).map_err(|err| (kind, err))?;
        Some(snap.version)
    } else {
        None
    };
    if let Some(parent) = live.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| (kind, VaultError::fs(parent, err)))?;
    }
    write_atomic(&live, bytes).map_err(|err| (kind, err))?;
    Ok(WriteReceipt {
        path: rel.to_string(),
        kind,
        snapshot_version,
        bytes_written: bytes.len() as u64,
    })
}

fn prune_unlocked(project: &Project, rel: &str, keep: usize) -> Result<usize, VaultError> {
    let prior = history(project, rel)?;
    if prior.len() <= keep {
        return Ok(0);
    }
    let dir = snapshot_dir(project, rel);
    let mut removed = 0;
    for snap in prior.iter().skip(keep) {
        let data = dir.join(snap.version.to_string());
        std::fs::remove_file(&data).map_err(|err| VaultError::fs(&data, err))?;
        let meta = dir.join(format!("{}{}", snap.version, META_SUFFIX));
        if meta.exists() {
            std::fs::remove_file(&meta).map_err(|err| VaultError::fs(&meta, err))?;
        }
        removed += 1;
    }
    log::info!("pruned {removed} snapshot versions of {rel}");
    Ok(removed)
}

/// Success appends an `ok` record (append failures propagate: an unrecorded
/// mutation would break the audit trail). Failure appends a `failed` record
/// but still returns the original error.
fn finish(
    project: &Project,
    kind: OperationKind,
    rel: &str,
    result: Result<Snapshot, VaultError>,
) -> Result<Snapshot, VaultError> {
    match result {
        Ok(snap) => {
            let rec = oplog::record(kind, rel, Outcome::Ok, None, Some(snap.version));
            oplog::append_unlocked(project, &rec)?;
            Ok(snap)
        }
        Err(err) => {
            record_failure(project, kind, rel, &err);
            Err(err)
        }
    }
}

fn record_failure(project: &Project, kind: OperationKind, rel: &str, err: &VaultError) {
    let rec = oplog::record(kind, rel, Outcome::Failed, Some(err.to_string()), None);
    if let Err(log_err) = oplog::append_unlocked(project, &rec) {
        log::warn!("could not record failed {kind:?} for {rel}: {log_err}");
    }
}

fn snapshot_dir(project: &Project, rel: &str) -> PathBuf {
    let mut dir = project.vault_dir().join(SNAPSHOT_DIR);
    for part in rel.split('/') {
        dir.push(part);
    }
    dir
}

fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Writes through a temporary sibling and renames into place, so a crash can
/// never leave a half-written file visible under its final name.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), VaultError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    let mut file = std::fs::File::create(&tmp).map_err(|err| VaultError::fs(&tmp, err))?;
    std::io::Write::write_all(&mut file, bytes).map_err(|err| VaultError::fs(&tmp, err))?;
    file.sync_all().map_err(|err| VaultError::fs(&tmp, err))?;
    std::fs::rename(&tmp, path).map_err(|err| VaultError::fs(path, err))?;
    Ok(())
}

fn load_snapshot_meta(rel: &str, dir: &Path, version: u64) -> Result<Snapshot, VaultError> {
    let meta_path = dir.join(format!("{version}{META_SUFFIX}"));
    if meta_path.is_file() {
        let raw =
            std::fs::read_to_string(&meta_path).map_err(|err| VaultError::fs(&meta_path, err))?;
        if let Ok(snap) = serde_json::from_str::<Snapshot>(&raw) {
            return Ok(snap);
        }
        log::warn!(
            "unreadable snapshot metadata at {}, rebuilding from content",
            meta_path.display()
        );
    }
    // Sidecar lost: rebuild what the stored bytes alone can prove.
    let data_path = dir.join(version.to_string());
    let bytes = std::fs::read(&data_path).map_err(|err| VaultError::fs(&data_path, err))?;
    Ok(Snapshot {
        path: rel.to_string(),
        version,
        timestamp: String::new(),
        fingerprint: fingerprint(&bytes),
        size: bytes.len() as u64,
    })
}
