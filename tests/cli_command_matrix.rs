use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

fn run_help(home: &TempDir, args: &[&str]) {
    let mut cmd = cargo_bin_cmd!("apkvault");
    cmd.env("HOME", home.path())
        .args(args)
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn every_cli_command_has_help_path() {
    let home = TempDir::new().expect("temp home");

    // top-level
    run_help(&home, &[]);

    // inspection commands
    run_help(&home, &["status"]);
    run_help(&home, &["list"]);
    run_help(&home, &["log"]);
    run_help(&home, &["validate"]);

    // vault commands
    run_help(&home, &["snapshot"]);
    run_help(&home, &["snapshot-all"]);
    run_help(&home, &["restore"]);
    run_help(&home, &["history"]);
    run_help(&home, &["backups"]);
    run_help(&home, &["prune"]);
    run_help(&home, &["write"]);
}
