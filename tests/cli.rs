use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/lsm_snapshot.json")
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aba-overview"))
        .current_dir(dir)
        .env_remove("LINKAHEAD_PASSWORD")
        .args(args)
        .output()
        .unwrap()
}

const PASSWORDLESS_CONFIG: &str = r#"{
    "linkahead": {"url": "https://linkahead.example.org", "username": "reader"},
    "synthetic": {"rows": 2, "cols": 1, "string_length": 3},
    "export": {"dir": "out", "format": "csv"}
}"#;

#[test]
fn snapshot_report_uses_local_config_without_password() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("aba-overview.json"), PASSWORDLESS_CONFIG).unwrap();

    let snapshot = fixture();
    let output = run_in(
        temp.path(),
        &["report", "--snapshot", snapshot.to_str().unwrap(), "--scan-type", "ct"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("CT Scan Data [synthetic]: 2 rows x 1 columns"));

    let csv = fs::read_to_string(temp.path().join("out/CT_overview.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.starts_with("column1\n"));
}

#[test]
fn snapshot_report_rejects_broken_config() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("aba-overview.json"), "{ broken").unwrap();

    let snapshot = fixture();
    let output = run_in(
        temp.path(),
        &["report", "--snapshot", snapshot.to_str().unwrap(), "--scan-type", "ct"],
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn json_report_lists_exported_files() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("aba-overview.json"), PASSWORDLESS_CONFIG).unwrap();

    let snapshot = fixture();
    let output = run_in(
        temp.path(),
        &[
            "--non-interactive",
            "report",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--scan-type",
            "lsm",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["sections"][0]["table"].as_array().unwrap().len(), 2);
    assert_eq!(json["export"]["format"], "csv");
    let path = json["export"]["files"][0]["path"].as_str().unwrap();
    assert!(path.ends_with("LSM_overview.csv"));
    assert!(temp.path().join("out/LSM_overview.csv").exists());
}
