use assert_cmd::Command;
use predicates::prelude::*;
use sopcheck_protocol::{
    AtomicRequirement, ObligationStrength, Passage, ReferenceIndex, Requirement, SourceLocation,
};
use sopcheck_vector_store::HashingBackend;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn sopcheck(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sopcheck").expect("binary");
    cmd.current_dir(workdir)
        .env_remove("SOPCHECK_API_KEY")
        .env("RUST_LOG", "info");
    cmd
}

fn write_index(workdir: &Path, requirements: Vec<Requirement>) {
    let index = ReferenceIndex::from_requirements(requirements);
    fs::write(
        workdir.join("reference_index.json"),
        serde_json::to_string_pretty(&index).unwrap(),
    )
    .unwrap();
}

fn retention_requirement() -> Requirement {
    let text = "Records must be retained for fifteen years";
    Requirement::Valid(AtomicRequirement {
        id: "gcp.pdf-4-1".to_string(),
        text: text.to_string(),
        obligation_strength: ObligationStrength::Must,
        source_document: "gcp.pdf".to_string(),
        source_location: SourceLocation::page(4),
        origin_context: format!("{text}."),
        embedding: HashingBackend::new(384).embed_one(text),
    })
}

#[test]
fn help_lists_both_commands() {
    let temp = tempdir().unwrap();
    sopcheck(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest").and(predicate::str::contains("verify")));
}

#[test]
fn verify_without_index_fails_before_writing_a_report() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("sop.txt"), "Staff are trained.").unwrap();

    sopcheck(temp.path())
        .args(["verify", "--sop", "sop.txt", "--bucket", "local"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No reference index"));
    assert!(!temp.path().join("gap_report.json").exists());
}

#[test]
fn tainted_index_is_refused() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("sop.txt"), "Staff are trained.").unwrap();
    write_index(
        temp.path(),
        vec![
            retention_requirement(),
            Requirement::decomposition_failed(&Passage::new("garbled", "gcp.pdf", 9), "no JSON"),
        ],
    );

    sopcheck(temp.path())
        .args(["verify", "--sop", "sop.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("decomposition failure"));
    assert!(!temp.path().join("gap_report.json").exists());
}

#[test]
fn ingest_of_only_missing_files_persists_nothing() {
    let temp = tempdir().unwrap();
    sopcheck(temp.path())
        .args(["ingest", "--files", "missing.pdf", "--bucket", "local"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing was persisted"));
    assert!(!temp.path().join("reference_index.json").exists());
}

#[test]
fn invalid_thresholds_are_rejected_at_startup() {
    let temp = tempdir().unwrap();
    sopcheck(temp.path())
        .args(["verify", "--sop", "sop.txt", "--low-threshold", "0.95"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn unknown_policy_is_a_usage_error() {
    let temp = tempdir().unwrap();
    sopcheck(temp.path())
        .args(["verify", "--sop", "sop.txt", "--policy", "lenient"])
        .assert()
        .failure();
}

#[test]
fn unrelated_sop_yields_missing_gap_without_adjudication() {
    let temp = tempdir().unwrap();
    write_index(temp.path(), vec![retention_requirement()]);
    fs::write(
        temp.path().join("sop.txt"),
        "Coffee machines are descaled weekly.",
    )
    .unwrap();

    sopcheck(temp.path())
        .args(["verify", "--sop", "sop.txt", "--output", "out/gaps.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total gaps found: 1"));

    let raw = fs::read_to_string(temp.path().join("out/gaps.json")).unwrap();
    let gaps: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(gaps.as_array().map(Vec::len), Some(1));
    assert_eq!(gaps[0]["requirement_id"], "gcp.pdf-4-1");
    assert_eq!(gaps[0]["status"], "MISSING");
    assert_eq!(gaps[0]["sop_evidence"], "Not Found");
    assert_eq!(gaps[0]["source_reference"], "gcp.pdf (Page 4)");
}

#[test]
fn config_file_supplies_storage_location() {
    let temp = tempdir().unwrap();
    let store = temp.path().join("store");
    fs::create_dir_all(&store).unwrap();
    write_index(&store, vec![retention_requirement()]);
    fs::write(temp.path().join("sop.txt"), "Coffee machines are descaled weekly.").unwrap();
    fs::write(
        temp.path().join("sopcheck.toml"),
        format!(
            "[storage]\nlocal_root = {:?}\n\n[verifier]\nlow_threshold = 0.2\n",
            store.display().to_string()
        ),
    )
    .unwrap();

    sopcheck(temp.path())
        .args(["--config", "sopcheck.toml", "verify", "--sop", "sop.txt"])
        .assert()
        .success();
    assert!(temp.path().join("gap_report.json").exists());
}

#[test]
fn schema_prints_gap_report_json_schema() {
    let temp = tempdir().unwrap();
    let output = sopcheck(temp.path())
        .args(["schema", "gap-report"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let schema: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(schema["type"], "array");
    assert!(schema.to_string().contains("sop_evidence"));

    sopcheck(temp.path())
        .args(["schema", "reference-index"])
        .assert()
        .success()
        .stdout(predicate::str::contains("decomposition_failed"));
}
