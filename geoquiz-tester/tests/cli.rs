use std::process::Command;

const SAMPLE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../geoquiz-game/data/sample_orp.geojson"
);

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "geoquiz-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_simulates_and_writes_json_report() {
    let exe = env!("CARGO_BIN_EXE_geoquiz-tester");
    let store = temp_path("sim-store");
    let output_path = temp_path("sim-report.json");
    let status = Command::new(exe)
        .args([
            "--mode", "simulate", "--report", "json", "--rounds", "5", "--seeds", "9",
        ])
        .arg("--catalogue")
        .arg(SAMPLE)
        .arg("--store")
        .arg(&store)
        .arg("--output")
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    let value: serde_json::Value = serde_json::from_str(&content).expect("json report");
    assert_eq!(value["overall"]["totalAttempts"], 5);
    assert!(store.join("geo_quiz_statistics.json").exists());
}

#[test]
fn cli_accumulates_across_invocations() {
    let exe = env!("CARGO_BIN_EXE_geoquiz-tester");
    let store = temp_path("acc-store");
    for seed in ["1", "2"] {
        let status = Command::new(exe)
            .args(["--report", "json", "--rounds", "3", "--seeds", seed])
            .arg("--catalogue")
            .arg(SAMPLE)
            .arg("--store")
            .arg(&store)
            .arg("--output")
            .arg(temp_path("acc-report.json"))
            .status()
            .expect("run cli");
        assert!(status.success());
    }
    let output = Command::new(exe)
        .args(["--mode", "report", "--report", "json"])
        .arg("--store")
        .arg(&store)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(value["overall"]["totalAttempts"], 6);
    assert_eq!(value["playTime"]["totalSessions"], 2);
}

#[test]
fn cli_reset_without_confirmation_fails() {
    let exe = env!("CARGO_BIN_EXE_geoquiz-tester");
    let output = Command::new(exe)
        .args(["--mode", "reset"])
        .arg("--store")
        .arg(temp_path("reset-store"))
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--yes"));
}

#[test]
fn cli_rejects_out_of_range_skill() {
    let exe = env!("CARGO_BIN_EXE_geoquiz-tester");
    let output = Command::new(exe)
        .args(["--skill", "2"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
}

#[test]
fn cli_export_writes_requested_file() {
    let exe = env!("CARGO_BIN_EXE_geoquiz-tester");
    let output_path = temp_path("export.json");
    let status = Command::new(exe)
        .args(["--mode", "export"])
        .arg("--store")
        .arg(temp_path("export-store"))
        .arg("--output")
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read export");
    let value: serde_json::Value = serde_json::from_str(&content).expect("export json");
    assert!(value.get("overall").is_some());
    assert!(value.get("sessions").is_some());
}
