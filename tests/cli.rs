//! Black-box tests of the `pyqt4to5` binary.

use assert_cmd::Command;

const QT4_SOURCE: &str = "from PyQt4.QtCore import Qt\n\nprint(Qt.AlignLeft)\n";

fn cmd() -> Command {
    Command::cargo_bin("pyqt4to5").unwrap()
}

#[test]
fn converts_a_single_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.py"), QT4_SOURCE).unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["app.py", "--nolog"])
        .assert()
        .success();

    let converted = std::fs::read_to_string(dir.path().join("app_PyQt5.py")).unwrap();
    assert!(converted.starts_with("from PyQt5.QtCore import Qt\n"));
    // Original untouched.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("app.py")).unwrap(),
        QT4_SOURCE
    );
}

#[test]
fn reports_progress_on_stdout() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.py"), QT4_SOURCE).unwrap();

    let output = cmd()
        .current_dir(dir.path())
        .args(["app.py", "--nolog"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Processing file: `app.py`"));
    assert!(stdout.contains("File updated."));
}

#[test]
fn json_format_prints_a_summary() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.py"), QT4_SOURCE).unwrap();
    std::fs::write(dir.path().join("plain.py"), "print('hi')\n").unwrap();

    let output = cmd()
        .current_dir(dir.path())
        .args([".", "-o", "out", "--nolog", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["updated"], 1);
    assert_eq!(summary["unchanged"], 1);
    assert_eq!(summary["errors"], 0);
}

#[test]
fn directory_mode_writes_a_log_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let proj = dir.path().join("proj");
    std::fs::create_dir(&proj).unwrap();
    std::fs::write(proj.join("app.py"), QT4_SOURCE).unwrap();

    cmd()
        .current_dir(dir.path())
        .arg("proj")
        .assert()
        .success();

    assert!(dir.path().join("proj_PyQt5/app.py").exists());
    let log = std::fs::read_to_string(dir.path().join("pyqt4_to_pyqt5.log")).unwrap();
    assert!(log.contains("File updated."));
}

#[test]
fn missing_path_fails() {
    cmd().args(["no_such_thing", "--nolog"]).assert().failure();
}
