//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `vault.rs` — snapshot/restore/history/backups/prune/write.
//! - `inspect.rs` — status/list/log/validate.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Keep behavior and output schema stable.

pub mod inspect;
pub mod vault;

pub use inspect::handle_inspect_commands;
pub use vault::handle_vault_commands;
