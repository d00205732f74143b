use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEIGHT: &str = "priority_variable:\nphv: phv00000001\ninput_data_type: integer\nvalue:\nMeasurementObservation:\n  unit: cm\n";

const ASTHMA: &str = "priority_variable: asthma\nphv: phv00000100\npht: pht000001\nvalue: 1\nCondition:\n  condition_status: PRESENT\n  condition_concept: MONDO:0004979   # asthma\n";

fn harmonizer() -> Command {
    let mut cmd = Command::cargo_bin("harmonizer").expect("Binary exists");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn validate_reports_each_file_and_fails_on_invalid() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "fhs-ingest/good.yaml", "class_derivations:\n  Condition: {}\n");
    write(dir.path(), "fhs-ingest/bad.yaml", "key: [unclosed\n");

    harmonizer()
        .arg("validate")
        .arg("--root")
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("bad.yaml is invalid"))
        .stdout(predicate::str::contains("good.yaml is valid"))
        .stdout(predicate::str::contains("1/2 files valid"));
}

#[test]
fn validate_all_valid_succeeds() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "mesa-ingest/a.yaml", "a: 1\n");

    harmonizer()
        .args(["validate", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1/1 files valid"));
}

#[test]
fn validate_without_files_exits_two() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "drafts/a.yaml", "a: 1\n");

    harmonizer()
        .args(["validate", "--root"])
        .arg(dir.path())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("No YAML files in directories with '-ingest' found"));
}

#[test]
fn transform_single_file_to_stdout() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "height.yaml", HEIGHT);

    harmonizer()
        .arg("transform")
        .arg(dir.path().join("height.yaml"))
        .args(["--cohort", "MESA"])
        .assert()
        .success()
        .stdout(predicate::str::contains("populated_from: MESA"))
        .stdout(predicate::str::contains("populated_from: phv00000001"));
}

#[test]
fn transform_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    harmonizer()
        .arg("transform")
        .arg(dir.path().join("nope.yaml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("❌ Error:"))
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn transform_batch_skips_unmarked_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "in/height.yaml", HEIGHT);
    write(dir.path(), "in/done.yaml", "class_derivations:\n");
    let output = dir.path().join("out");

    harmonizer()
        .arg("transform")
        .arg(dir.path().join("in"))
        .arg(&output)
        .args(["--batch", "--verbose"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Skipped"))
        .stderr(predicate::str::contains("Transformed 1 of 2 files"));

    assert!(output.join("height.yaml").is_file());
    assert!(!output.join("done.yaml").exists());
}

#[test]
fn conditions_single_file_writes_output_and_summary() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "asthma.yaml", ASTHMA);
    write(
        dir.path(),
        "visits.csv",
        "data table pht,participant ID phv,associated visit\npht000001,phv00000001,Exam 1\n",
    );
    let output = dir.path().join("asthma_out.yaml");

    harmonizer()
        .arg("conditions")
        .arg(dir.path().join("asthma.yaml"))
        .arg("--output")
        .arg(&output)
        .arg("--lookup")
        .arg(dir.path().join("visits.csv"))
        .assert()
        .success();

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("relationship_to_participant"));
    assert!(dir.path().join("asthma_out.yaml_summary.txt").is_file());
}
