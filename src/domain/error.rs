use std::path::PathBuf;

/// Failure taxonomy for the vault core. Every variant carries enough context
/// (path, version, cause) for a caller to decide retry vs abort, and maps to
/// a stable machine code in `--json` error envelopes.
#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    #[error("not a decompiled apk project: {root} (missing res/ directory)")]
    NotAProject { root: PathBuf },
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("path escapes the project root: {path}")]
    EscapesProject { path: String },
    #[error("no live file to snapshot: {path}")]
    SourceMissing { path: String },
    #[error("no snapshot version {version} for {path}")]
    VersionNotFound { path: String, version: u64 },
    #[error("operation log unreadable at {path}, line {line}")]
    LogCorrupted { path: PathBuf, line: usize },
}

impl VaultError {
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::NotAProject { .. } => "NOT_A_PROJECT",
            VaultError::Filesystem { .. } => "FILESYSTEM_ERROR",
            VaultError::EscapesProject { .. } => "ESCAPES_PROJECT",
            VaultError::SourceMissing { .. } => "SOURCE_MISSING",
            VaultError::VersionNotFound { .. } => "VERSION_NOT_FOUND",
            VaultError::LogCorrupted { .. } => "LOG_CORRUPTED",
        }
    }

    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> VaultError {
        VaultError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
