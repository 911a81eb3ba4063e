use crate::cli::Category;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub ok: bool,
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// One immutable versioned copy of a single file's content.
///
/// `path` is the project-relative, `/`-separated location of the live file.
/// `version` is scoped to that path, starts at 1 and only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub path: String,
    pub version: u64,
    pub timestamp: String,
    pub fingerprint: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Modify,
    Delete,
    Restore,
    Snapshot,
    Prune,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Failed,
}

/// One audit-log entry for an attempted mutation. Append-only: entries are
/// never edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub kind: OperationKind,
    pub path: String,
    pub timestamp: String,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_version: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One validation result for one file. Value type, produced fresh on each
/// run and never persisted into the project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub rule: &'static str,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Aggregated outcome of one validation run. Contains no timestamps or other
/// run-varying data: identical input must yield a byte-identical report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub findings: Vec<Finding>,
    pub errors: usize,
    pub warnings: usize,
    pub verdict: Verdict,
}

impl Report {
    pub fn from_findings(findings: Vec<Finding>) -> Report {
        let errors = findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count();
        let warnings = findings.len() - errors;
        let verdict = if errors == 0 {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        Report {
            findings,
            errors,
            warnings,
            verdict,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceFile {
    pub path: String,
    pub category: Category,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub path: String,
    pub error: String,
}

/// Result of a bulk snapshot pass. Per-item failures are collected, never
/// fatal: the batch always runs to the end (or to a requested stop).
#[derive(Debug, Serialize)]
pub struct BulkReport {
    pub snapshots: Vec<Snapshot>,
    pub failures: Vec<BulkFailure>,
    pub stopped_early: bool,
}

#[derive(Debug, Serialize)]
pub struct StructureReport {
    pub root: String,
    pub has_manifest: bool,
    pub has_resources: bool,
    pub has_layouts: bool,
    pub resource_files: usize,
}

#[derive(Debug, Serialize)]
pub struct WriteReceipt {
    pub path: String,
    pub kind: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_version: Option<u64>,
    pub bytes_written: u64,
}

#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct ValidationConfig {
    #[serde(default)]
    pub disabled_rules: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_dir_suffix")]
    pub dir_suffix: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        BackupConfig {
            dir_suffix: default_dir_suffix(),
        }
    }
}

fn default_dir_suffix() -> String {
    ".apkvault".to_string()
}
