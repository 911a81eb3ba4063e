//! Service layer containing the vault core and side-effect helpers.
//!
//! ## Service map
//! - `project.rs` — project root detection + resource tree enumeration.
//! - `backup.rs` — versioned snapshots, restore, bulk snapshot, prune.
//! - `oplog.rs` — append-only operation log (JSONL) + ordered reads.
//! - `lockmap.rs` — per-project-root mutation serialization.
//! - `validate.rs` — validation engine: parse, index, rule pipeline, report.
//! - `rules.rs` — the Rule trait and the builtin rule set.
//! - `config.rs` — optional user config (config.toml).
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Core services return `Result<_, VaultError>`; only CLI-ambient helpers
//!   use `anyhow`.
//! - Mutating calls take the project root lock; read-only calls never do.
//! - Keep command handlers thin; delegate to services.

pub mod backup;
pub mod config;
pub mod lockmap;
pub mod oplog;
pub mod output;
pub mod project;
pub mod rules;
pub mod validate;
