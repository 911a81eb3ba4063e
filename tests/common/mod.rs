use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub project: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).expect("create isolated home");

        let project = make_fixture_project(tmp.path());

        Self {
            _tmp: tmp,
            home,
            project,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("apkvault");
        cmd.env("HOME", &self.home);
        cmd
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .arg("--project")
            .arg(self.project.to_str().expect("project path utf8"))
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn run_json_fail(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .arg("--project")
            .arg(self.project.to_str().expect("project path utf8"))
            .args(args)
            .assert()
            .failure()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn project_file(&self, rel: &str) -> PathBuf {
        self.project.join(rel)
    }
}

pub fn make_fixture_project(base: &Path) -> PathBuf {
    let root = base.join("app");
    fs::create_dir_all(root.join("res/layout")).expect("create layout dir");
    fs::create_dir_all(root.join("res/values")).expect("create values dir");
    fs::create_dir_all(root.join("res/drawable")).expect("create drawable dir");

    fs::write(
        root.join("AndroidManifest.xml"),
        r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.fixture">
    <uses-permission android:name="android.permission.INTERNET"/>
    <application android:label="@string/app_name"/>
</manifest>
"#,
    )
    .expect("write manifest");

    fs::write(
        root.join("res/values/strings.xml"),
        r#"<resources>
    <string name="app_name">Fixture App</string>
    <string name="greeting">Hello</string>
</resources>
"#,
    )
    .expect("write strings");

    fs::write(
        root.join("res/layout/main.xml"),
        r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"
    android:layout_width="match_parent"
    android:layout_height="match_parent">
    <TextView
        android:id="@+id/title"
        android:layout_width="wrap_content"
        android:layout_height="wrap_content"
        android:text="@string/app_name"/>
    <ImageView
        android:id="@+id/logo"
        android:layout_width="wrap_content"
        android:layout_height="wrap_content"
        android:src="@drawable/icon"
        android:contentDescription="@string/greeting"/>
</LinearLayout>
"#,
    )
    .expect("write layout");

    fs::write(root.join("res/drawable/icon.png"), b"\x89PNG fixture").expect("write drawable");

    root
}
