use crate::*;
use chrono::{DateTime, Utc};

pub fn handle_inspect_commands(cli: &Cli, cfg: &ConfigFile) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Status => {
            let project = project::resolve(&cli.project, cfg)?;
            let report = project::structure_report(&project)?;
            print_one(cli.json, report, |r| {
                format!(
                    "root={} manifest={} res={} layouts={} files={}",
                    r.root, r.has_manifest, r.has_resources, r.has_layouts, r.resource_files
                )
            })?;
        }
        Commands::List { category } => {
            let project = project::resolve(&cli.project, cfg)?;
            let files = project::list_resource_files(&project, *category)?;
            print_out(cli.json, &files, |f| {
                format!("{}\t{:?}\t{} bytes", f.path, f.category, f.size)
            })?;
        }
        Commands::Log { path, since } => {
            let project = project::resolve(&cli.project, cfg)?;
            let mut entries = match since {
                Some(raw) => {
                    let since = DateTime::parse_from_rfc3339(raw)
                        .map_err(|err| anyhow::anyhow!("invalid --since timestamp: {err}"))?
                        .with_timezone(&Utc);
                    oplog::entries_since(&project, &since)?
                }
                None => oplog::entries_for(&project, path.as_deref())?,
            };
            if since.is_some() {
                if let Some(rel) = path {
                    entries.retain(|r| &r.path == rel);
                }
            }
            print_out(cli.json, &entries, |r| {
                format!(
                    "{}\t{:?}\t{}\t{:?}{}",
                    r.timestamp,
                    r.kind,
                    r.path,
                    r.outcome,
                    r.snapshot_version
                        .map(|v| format!("\tv{v}"))
                        .unwrap_or_default()
                )
            })?;
        }
        Commands::Validate { path } => {
            let project = project::resolve(&cli.project, cfg)?;
            let scope = match path {
                Some(rel) => validate::Scope::Path(rel.clone()),
                None => validate::Scope::Project,
            };
            let report = validate::validate(&project, &scope, &cfg.validation, None)?;
            let passed = report.verdict == Verdict::Pass;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&JsonOut {
                        ok: passed,
                        data: &report
                    })?
                );
            } else {
                for f in &report.findings {
                    let locator = match f.line {
                        Some(line) => format!("{}:{}", f.path, line),
                        None => f.path.clone(),
                    };
                    println!(
                        "{}\t{}\t{}\t{}",
                        match f.severity {
                            Severity::Error => "error",
                            Severity::Warning => "warning",
                        },
                        f.rule,
                        locator,
                        f.message
                    );
                }
                println!(
                    "errors: {} warnings: {} verdict: {}",
                    report.errors,
                    report.warnings,
                    if passed { "pass" } else { "fail" }
                );
            }
            if !passed {
                std::process::exit(1);
            }
        }
        _ => return Ok(false),
    }

    Ok(true)
}
