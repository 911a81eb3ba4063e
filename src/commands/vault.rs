use crate::*;

pub fn handle_vault_commands(cli: &Cli, cfg: &ConfigFile) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Snapshot { path } => {
            let project = project::resolve(&cli.project, cfg)?;
            let snap = backup::snapshot(&project, path)?;
            print_one(cli.json, snap, |s| {
                format!("snapshot {} v{} ({})", s.path, s.version, s.fingerprint)
            })?;
        }
        Commands::SnapshotAll => {
            let project = project::resolve(&cli.project, cfg)?;
            let report = backup::snapshot_all(&project, None)?;
            let clean = report.failures.is_empty();
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&JsonOut {
                        ok: clean,
                        data: &report
                    })?
                );
            } else {
                println!(
                    "snapshots: {} ok, {} failed",
                    report.snapshots.len(),
                    report.failures.len()
                );
                for failure in &report.failures {
                    println!("{}\t{}", failure.path, failure.error);
                }
            }
            if !clean {
                std::process::exit(1);
            }
        }
        Commands::Restore { path, version } => {
            let project = project::resolve(&cli.project, cfg)?;
            let snap = backup::restore(&project, path, *version)?;
            print_one(cli.json, snap, |s| {
                format!("restored {} to v{}", s.path, s.version)
            })?;
        }
        Commands::History { path } => {
            let project = project::resolve(&cli.project, cfg)?;
            let history = backup::history(&project, path)?;
            print_out(cli.json, &history, |s| {
                format!("v{}\t{}\t{}\t{} bytes", s.version, s.timestamp, s.fingerprint, s.size)
            })?;
        }
        Commands::Backups => {
            let project = project::resolve(&cli.project, cfg)?;
            let all = backup::list_all(&project)?;
            print_out(cli.json, &all, |s| {
                format!("{}\tv{}\t{}", s.path, s.version, s.timestamp)
            })?;
        }
        Commands::Prune { path, keep } => {
            let project = project::resolve(&cli.project, cfg)?;
            let removed = backup::prune(&project, path, *keep)?;
            print_one(cli.json, removed, |n| {
                format!("pruned {} snapshot versions", n)
            })?;
        }
        Commands::Write { path, from } => {
            let project = project::resolve(&cli.project, cfg)?;
            let bytes = std::fs::read(from)
                .map_err(|err| anyhow::anyhow!("cannot read {}: {err}", from.display()))?;
            let receipt = backup::write_file(&project, path, &bytes)?;
            print_one(cli.json, receipt, |r| {
                format!(
                    "{:?} {} ({} bytes, snapshot {})",
                    r.kind,
                    r.path,
                    r.bytes_written,
                    r.snapshot_version
                        .map(|v| format!("v{v}"))
                        .unwrap_or_else(|| "none".to_string())
                )
            })?;
        }
        _ => return Ok(false),
    }

    Ok(true)
}
