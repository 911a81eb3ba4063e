use crate::cli::Category;
use crate::domain::error::VaultError;
use crate::domain::models::{ConfigFile, ResourceFile, StructureReport};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Handle to a verified decompiled project. Obtained through [`resolve`] and
/// passed explicitly to every call; there is no process-wide current project.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    vault_dir: PathBuf,
}

impl Project {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Side directory beside the project root holding snapshots and the
    /// operation log.
    pub fn vault_dir(&self) -> &Path {
        &self.vault_dir
    }

    /// Maps a `/`-separated project-relative path onto the live tree.
    /// Absolute paths and `..` components are rejected so a caller can never
    /// address anything outside the root.
    pub fn live_path(&self, rel: &str) -> Result<PathBuf, VaultError> {
        if rel.is_empty() || rel.starts_with('/') {
            return Err(VaultError::EscapesProject {
                path: rel.to_string(),
            });
        }
        let mut out = self.root.clone();
        for part in rel.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return Err(VaultError::EscapesProject {
                    path: rel.to_string(),
                });
            }
            out.push(part);
        }
        Ok(out)
    }
}

/// Verifies that `root` is a decompiled apk project (an existing directory
/// with a `res/` subtree). Read-only; re-run before every mutating call
/// because the tree may change between calls.
pub fn resolve(root: &Path, cfg: &ConfigFile) -> Result<Project, VaultError> {
    if !root.is_dir() {
        return Err(VaultError::NotAProject {
            root: root.to_path_buf(),
        });
    }
    let root = root
        .canonicalize()
        .map_err(|err| VaultError::fs(root, err))?;
    if !root.join("res").is_dir() {
        return Err(VaultError::NotAProject { root });
    }
    let name = match root.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => {
            return Err(VaultError::NotAProject { root });
        }
    };
    let vault_dir = root.with_file_name(format!("{}{}", name, cfg.backup.dir_suffix));
    Ok(Project { root, vault_dir })
}

/// Resource category of a project-relative path, inferred from the directory
/// the way apktool lays trees out (`res/layout-land/` is still a layout).
pub fn classify(rel: &str) -> Category {
    if rel == "AndroidManifest.xml" {
        return Category::Manifest;
    }
    let mut parts = rel.split('/');
    if parts.next() != Some("res") {
        return Category::Raw;
    }
    let dir = match parts.next() {
        Some(dir) => dir,
        None => return Category::Raw,
    };
    match dir.split('-').next().unwrap_or(dir) {
        "layout" => Category::Layout,
        "values" => Category::Values,
        "drawable" | "mipmap" => Category::Drawable,
        _ => Category::Raw,
    }
}

/// Enumerates every file under `res/` plus the manifest, sorted by relative
/// path so downstream consumers see a stable order. Traversal errors surface
/// as `FilesystemError` with the offending path, never silently skipped.
pub fn list_resource_files(
    project: &Project,
    filter: Option<Category>,
) -> Result<Vec<ResourceFile>, VaultError> {
    let mut out = Vec::new();

    let manifest = project.root().join("AndroidManifest.xml");
    if manifest.is_file() {
        let size = manifest
            .metadata()
            .map_err(|err| VaultError::fs(&manifest, err))?
            .len();
        out.push(ResourceFile {
            path: "AndroidManifest.xml".to_string(),
            category: Category::Manifest,
            size,
        });
    }

    let res = project.root().join("res");
    for entry in WalkDir::new(&res).sort_by_file_name() {
        let entry = entry.map_err(|err| walk_error(&res, err))?;
        let file_type = entry.file_type();
        if !file_type.is_file() && !file_type.is_symlink() {
            continue;
        }
        let rel = match entry.path().strip_prefix(project.root()) {
            Ok(rel) => rel_string(rel),
            Err(_) => continue,
        };
        // Stat through symlinks for the live size; a dangling link still
        // deserves a listing so snapshot-all can report it as a failure.
        let size = entry.path().metadata().map(|m| m.len()).unwrap_or(0);
        out.push(ResourceFile {
            category: classify(&rel),
            path: rel,
            size,
        });
    }

    out.sort_by(|a, b| a.path.cmp(&b.path));
    if let Some(category) = filter {
        out.retain(|f| f.category == category);
    }
    Ok(out)
}

pub fn structure_report(project: &Project) -> Result<StructureReport, VaultError> {
    let files = list_resource_files(project, None)?;
    Ok(StructureReport {
        root: project.root().display().to_string(),
        has_manifest: project.root().join("AndroidManifest.xml").is_file(),
        has_resources: project.root().join("res").is_dir(),
        has_layouts: project.root().join("res").join("layout").is_dir(),
        resource_files: files.len(),
    })
}

fn rel_string(rel: &Path) -> String {
    rel.iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn walk_error(res: &Path, err: walkdir::Error) -> VaultError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| res.to_path_buf());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
    VaultError::Filesystem { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ConfigFile;
    use std::fs;
    use tempfile::TempDir;

    fn make_project(tmp: &TempDir) -> Project {
        let root = tmp.path().join("app");
        fs::create_dir_all(root.join("res/layout")).expect("create layout dir");
        fs::create_dir_all(root.join("res/values")).expect("create values dir");
        fs::write(root.join("AndroidManifest.xml"), "<manifest/>").expect("write manifest");
        fs::write(root.join("res/layout/main.xml"), "<LinearLayout/>").expect("write layout");
        fs::write(root.join("res/values/strings.xml"), "<resources/>").expect("write values");
        resolve(&root, &ConfigFile::default()).expect("resolve project")
    }

    #[test]
    fn resolve_rejects_roots_without_resources() {
        let tmp = TempDir::new().expect("temp dir");
        let bare = tmp.path().join("bare");
        fs::create_dir_all(&bare).expect("create dir");
        let err = resolve(&bare, &ConfigFile::default()).expect_err("must fail");
        assert!(matches!(err, VaultError::NotAProject { .. }));
    }

    #[test]
    fn resolve_rejects_missing_roots() {
        let tmp = TempDir::new().expect("temp dir");
        let err = resolve(&tmp.path().join("nope"), &ConfigFile::default()).expect_err("must fail");
        assert!(matches!(err, VaultError::NotAProject { .. }));
    }

    #[test]
    fn live_path_rejects_escapes() {
        let tmp = TempDir::new().expect("temp dir");
        let project = make_project(&tmp);
        assert!(project.live_path("res/layout/main.xml").is_ok());
        for bad in ["/etc/passwd", "../outside", "res/../../x", ""] {
            let err = project.live_path(bad).expect_err("must reject");
            assert!(matches!(err, VaultError::EscapesProject { .. }), "{bad}");
        }
    }

    #[test]
    fn classify_covers_qualified_directories() {
        assert_eq!(classify("AndroidManifest.xml"), Category::Manifest);
        assert_eq!(classify("res/layout/main.xml"), Category::Layout);
        assert_eq!(classify("res/layout-land/main.xml"), Category::Layout);
        assert_eq!(classify("res/values-es/strings.xml"), Category::Values);
        assert_eq!(classify("res/drawable-xhdpi/icon.png"), Category::Drawable);
        assert_eq!(classify("res/mipmap-hdpi/ic_launcher.png"), Category::Drawable);
        assert_eq!(classify("res/xml/prefs.xml"), Category::Raw);
        assert_eq!(classify("smali/com/App.smali"), Category::Raw);
    }

    #[test]
    fn listing_is_sorted_and_filterable() {
        let tmp = TempDir::new().expect("temp dir");
        let project = make_project(&tmp);
        let all = list_resource_files(&project, None).expect("list");
        let paths: Vec<&str> = all.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "AndroidManifest.xml",
                "res/layout/main.xml",
                "res/values/strings.xml"
            ]
        );
        let layouts = list_resource_files(&project, Some(Category::Layout)).expect("list layouts");
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].path, "res/layout/main.xml");
    }
}
