use crate::cli::Category;
use crate::domain::error::VaultError;
use crate::domain::models::{Finding, Report, ResourceFile, Severity, ValidationConfig};
use crate::services::project::{self, Project};
use crate::services::rules::{self, CheckedFile, ResourceIndex, Rule};
use std::sync::atomic::{AtomicBool, Ordering};

/// What a validation run covers: the whole project, or everything at or
/// under one relative path.
#[derive(Debug, Clone)]
pub enum Scope {
    Project,
    Path(String),
}

/// Runs the rule pipeline over every XML resource file in scope and
/// aggregates the findings in file-traversal order, then rule order within a
/// file. Content problems become findings, never errors; only files the
/// engine cannot read at all escalate. The result carries no run-varying
/// data, so identical input yields a byte-identical report.
pub fn validate(
    project: &Project,
    scope: &Scope,
    cfg: &ValidationConfig,
    stop: Option<&AtomicBool>,
) -> Result<Report, VaultError> {
    let all = project::list_resource_files(project, None)?;
    let xml: Vec<&ResourceFile> = all.iter().filter(|f| f.path.ends_with(".xml")).collect();
    let index = build_index(project, &all, &xml)?;

    let pipeline: Vec<Box<dyn Rule>> = rules::builtin_rules()
        .into_iter()
        .filter(|rule| !cfg.disabled_rules.iter().any(|id| id == rule.id()))
        .collect();

    let mut findings = Vec::new();
    let mut checked = 0usize;
    for file in xml.iter().copied().filter(|f| in_scope(scope, &f.path)) {
        if stop.map(|s| s.load(Ordering::Relaxed)).unwrap_or(false) {
            log::info!("validation stopped early after {checked} files");
            break;
        }
        check_file(project, file, &pipeline, &index, &mut findings)?;
        checked += 1;
    }
    log::debug!("validated {checked} files, {} findings", findings.len());
    Ok(Report::from_findings(findings))
}

fn in_scope(scope: &Scope, rel: &str) -> bool {
    match scope {
        Scope::Project => true,
        Scope::Path(prefix) => rel == prefix || rel.starts_with(&format!("{prefix}/")),
    }
}

fn check_file(
    project: &Project,
    file: &ResourceFile,
    pipeline: &[Box<dyn Rule>],
    index: &ResourceIndex,
    findings: &mut Vec<Finding>,
) -> Result<(), VaultError> {
    let live = project.live_path(&file.path)?;
    let bytes = std::fs::read(&live).map_err(|err| VaultError::fs(&live, err))?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => {
            findings.push(malformed(file, None, "not valid UTF-8".to_string()));
            return Ok(());
        }
    };
    let doc = match roxmltree::Document::parse(&text) {
        Ok(doc) => doc,
        // A file that does not parse gets exactly one finding; the rest of
        // the pipeline assumes a tree and is skipped for this file.
        Err(err) => {
            findings.push(malformed(
                file,
                Some(err.pos().row),
                format!("not well-formed XML: {err}"),
            ));
            return Ok(());
        }
    };
    let checked = CheckedFile {
        path: &file.path,
        category: file.category,
        doc: &doc,
    };
    for rule in pipeline {
        if rule.applies(&checked) {
            findings.extend(rule.evaluate(&checked, index));
        }
    }
    Ok(())
}

fn malformed(file: &ResourceFile, line: Option<u32>, message: String) -> Finding {
    Finding {
        severity: Severity::Error,
        rule: "malformed-document",
        path: file.path.clone(),
        line,
        message,
    }
}

/// Builds the project-wide resource name index references resolve against.
/// File-based resources come straight from the tree layout; `values/`
/// declarations and `@+id/` markers need a parse. Files that do not parse
/// contribute nothing here; they get their own finding when in scope.
fn build_index(
    project: &Project,
    all: &[ResourceFile],
    xml: &[&ResourceFile],
) -> Result<ResourceIndex, VaultError> {
    let mut index = ResourceIndex::default();
    for file in all {
        if let Some((ty, name)) = file_resource_entry(&file.path) {
            index.insert(&ty, &name);
        }
    }
    for file in xml {
        let live = project.live_path(&file.path)?;
        let bytes = match std::fs::read(&live) {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => continue,
        };
        let doc = match roxmltree::Document::parse(&text) {
            Ok(doc) => doc,
            Err(_) => continue,
        };
        collect_declarations(&doc, file.category, &mut index);
    }
    log::debug!("resource index holds {} names", index.len());
    Ok(index)
}

/// `res/layout-land/main.xml` declares `layout/main`; qualifiers only pick
/// alternates, the reference name is the bare type and stem. `values/` files
/// declare by element name, not by file name.
fn file_resource_entry(rel: &str) -> Option<(String, String)> {
    let mut parts = rel.split('/');
    if parts.next() != Some("res") {
        return None;
    }
    let dir = parts.next()?;
    let file = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let ty = dir.split('-').next().unwrap_or(dir);
    if ty == "values" {
        return None;
    }
    let stem = file.split('.').next().unwrap_or(file);
    if stem.is_empty() {
        return None;
    }
    Some((ty.to_string(), stem.to_string()))
}

fn collect_declarations(doc: &roxmltree::Document, category: Category, index: &mut ResourceIndex) {
    for node in doc.descendants().filter(|n| n.is_element()) {
        for attr in node.attributes() {
            if let Some(name) = attr.value().strip_prefix("@+id/") {
                index.insert("id", name);
            }
        }
    }
    if category != Category::Values {
        return;
    }
    let root = doc.root_element();
    if root.tag_name().name() != "resources" {
        return;
    }
    for child in root.children().filter(|n| n.is_element()) {
        let tag = child.tag_name().name();
        let name = match child.attribute("name") {
            Some(name) => name,
            None => continue,
        };
        let ty = match tag {
            "item" => child.attribute("type").unwrap_or("item"),
            "string-array" | "integer-array" => "array",
            "declare-styleable" => "styleable",
            other => other,
        };
        index.insert(ty, name);
        if tag == "declare-styleable" {
            for attr_node in child.children().filter(|n| n.is_element()) {
                if let Some(attr_name) = attr_node.attribute("name") {
                    index.insert("attr", attr_name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ConfigFile, Verdict};
    use std::fs;
    use tempfile::TempDir;

    fn valid_project(tmp: &TempDir) -> Project {
        let root = tmp.path().join("app");
        fs::create_dir_all(root.join("res/layout")).expect("create layout");
        fs::create_dir_all(root.join("res/values")).expect("create values");
        fs::create_dir_all(root.join("res/drawable")).expect("create drawable");
        fs::write(
            root.join("AndroidManifest.xml"),
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example"><application android:label="@string/app_name"/></manifest>"#,
        )
        .expect("write manifest");
        fs::write(
            root.join("res/values/strings.xml"),
            r#"<resources><string name="app_name">Fixture</string></resources>"#,
        )
        .expect("write strings");
        fs::write(
            root.join("res/layout/main.xml"),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android" android:layout_width="match_parent" android:layout_height="match_parent"><ImageView android:id="@+id/logo" android:layout_width="wrap_content" android:layout_height="wrap_content" android:src="@drawable/icon" android:contentDescription="@string/app_name"/></LinearLayout>"#,
        )
        .expect("write layout");
        fs::write(root.join("res/drawable/icon.png"), b"\x89PNG").expect("write drawable");
        project::resolve(&root, &ConfigFile::default()).expect("resolve")
    }

    #[test]
    fn valid_project_passes_with_no_findings() {
        let tmp = TempDir::new().expect("temp dir");
        let project = valid_project(&tmp);
        let report = validate(
            &project,
            &Scope::Project,
            &ValidationConfig::default(),
            None,
        )
        .expect("validate");
        assert_eq!(report.findings.len(), 0, "{:?}", report.findings);
        assert_eq!(report.errors, 0);
        assert_eq!(report.warnings, 0);
        assert_eq!(report.verdict, Verdict::Pass);
    }

    #[test]
    fn unresolved_reference_fails_with_exactly_one_error() {
        let tmp = TempDir::new().expect("temp dir");
        let project = valid_project(&tmp);
        fs::write(
            project.root().join("res/layout/extra.xml"),
            r#"<TextView xmlns:android="http://schemas.android.com/apk/res/android" android:layout_width="wrap_content" android:layout_height="wrap_content" android:text="@string/missing"/>"#,
        )
        .expect("write extra layout");

        let report = validate(
            &project,
            &Scope::Project,
            &ValidationConfig::default(),
            None,
        )
        .expect("validate");
        assert_eq!(report.errors, 1);
        assert_eq!(report.verdict, Verdict::Fail);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].rule, "broken-reference");
        assert_eq!(report.findings[0].path, "res/layout/extra.xml");
    }

    #[test]
    fn malformed_file_short_circuits_its_pipeline() {
        let tmp = TempDir::new().expect("temp dir");
        let project = valid_project(&tmp);
        // Unclosed tag plus a reference that would also be broken; only the
        // parse failure may be reported.
        fs::write(
            project.root().join("res/layout/broken.xml"),
            r#"<LinearLayout><TextView android:text="@string/nope">"#,
        )
        .expect("write broken layout");

        let report = validate(
            &project,
            &Scope::Project,
            &ValidationConfig::default(),
            None,
        )
        .expect("validate");
        let for_file: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.path == "res/layout/broken.xml")
            .collect();
        assert_eq!(for_file.len(), 1);
        assert_eq!(for_file[0].rule, "malformed-document");
        assert_eq!(for_file[0].severity, Severity::Error);
    }

    #[test]
    fn warnings_never_flip_the_verdict() {
        let tmp = TempDir::new().expect("temp dir");
        let project = valid_project(&tmp);
        fs::write(
            project.root().join("res/values/extra.xml"),
            r#"<resources><string name="empty"></string></resources>"#,
        )
        .expect("write extra values");

        let report = validate(
            &project,
            &Scope::Project,
            &ValidationConfig::default(),
            None,
        )
        .expect("validate");
        assert_eq!(report.errors, 0);
        assert_eq!(report.warnings, 1);
        assert_eq!(report.verdict, Verdict::Pass);
    }

    #[test]
    fn scope_narrows_to_one_directory_or_file() {
        let tmp = TempDir::new().expect("temp dir");
        let project = valid_project(&tmp);
        fs::write(
            project.root().join("res/values/bad.xml"),
            r#"<resources><color name="c">nope</color></resources>"#,
        )
        .expect("write bad values");

        let whole = validate(
            &project,
            &Scope::Project,
            &ValidationConfig::default(),
            None,
        )
        .expect("validate");
        assert_eq!(whole.errors, 1);

        let layouts = validate(
            &project,
            &Scope::Path("res/layout".to_string()),
            &ValidationConfig::default(),
            None,
        )
        .expect("validate layouts");
        assert_eq!(layouts.errors, 0);
        assert_eq!(layouts.verdict, Verdict::Pass);

        let just_bad = validate(
            &project,
            &Scope::Path("res/values/bad.xml".to_string()),
            &ValidationConfig::default(),
            None,
        )
        .expect("validate one file");
        assert_eq!(just_bad.errors, 1);
        assert_eq!(just_bad.findings.len(), 1);
    }

    #[test]
    fn repeat_runs_produce_byte_identical_reports() {
        let tmp = TempDir::new().expect("temp dir");
        let project = valid_project(&tmp);
        fs::write(
            project.root().join("res/values/mixed.xml"),
            r#"<resources><string name="empty"></string><color name="c">bad</color></resources>"#,
        )
        .expect("write mixed values");

        let first = validate(
            &project,
            &Scope::Project,
            &ValidationConfig::default(),
            None,
        )
        .expect("first run");
        let second = validate(
            &project,
            &Scope::Project,
            &ValidationConfig::default(),
            None,
        )
        .expect("second run");
        let a = serde_json::to_string(&first).expect("serialize first");
        let b = serde_json::to_string(&second).expect("serialize second");
        assert_eq!(a, b);
    }

    #[test]
    fn disabled_rules_drop_out_of_the_pipeline() {
        let tmp = TempDir::new().expect("temp dir");
        let project = valid_project(&tmp);
        fs::write(
            project.root().join("res/values/extra.xml"),
            r#"<resources><string name="empty"></string></resources>"#,
        )
        .expect("write extra values");

        let cfg = ValidationConfig {
            disabled_rules: vec!["empty-string".to_string()],
        };
        let report = validate(&project, &Scope::Project, &cfg, None).expect("validate");
        assert_eq!(report.warnings, 0);
    }

    #[test]
    fn stop_flag_returns_partial_results() {
        let tmp = TempDir::new().expect("temp dir");
        let project = valid_project(&tmp);
        let stop = AtomicBool::new(true);
        let report = validate(
            &project,
            &Scope::Project,
            &ValidationConfig::default(),
            Some(&stop),
        )
        .expect("validate");
        assert!(report.findings.is_empty());
        assert_eq!(report.verdict, Verdict::Pass);
    }
}
