//! End-to-end CLI tests

use std::io::Write as _;

use assert_cmd::Command;
use predicates::prelude::*;

const MORPHOLOGY: &str = "\
1 1 0 0 0 6.0 -1
2 1 0 8 0 6.0 1
3 3 0 8 0 0.8 2
4 3 0 20 0 0.7 3
";

const DEFINITION: &str = r#"
[cable_types.soma.cable]
Ra = 10.0
cm = 1.0

[cable_types.soma.mechanisms.pas]
e = -70.0
g = 0.01

[cable_types.basal_dendrite.cable]
Ra = 10.0
cm = 1.0
"#;

fn arbz() -> Command {
    Command::cargo_bin("arbz").expect("binary builds")
}

fn write_file(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create fixture");
    file.write_all(text.as_bytes()).expect("write fixture");
    path
}

#[test]
fn inspect_prints_morphology_stats() {
    let dir = tempfile::tempdir().unwrap();
    let morphology = write_file(&dir, "cell.swc", MORPHOLOGY);

    arbz()
        .arg("inspect")
        .arg(&morphology)
        .assert()
        .success()
        .stdout(predicate::str::contains("Branches:   2"))
        .stdout(predicate::str::contains("Points:     4"))
        .stdout(predicate::str::contains("basal_dendrite"));
}

#[test]
fn check_accepts_a_valid_definition() {
    let dir = tempfile::tempdir().unwrap();
    let morphology = write_file(&dir, "cell.swc", MORPHOLOGY);
    let definition = write_file(&dir, "model.toml", DEFINITION);

    arbz()
        .arg("check")
        .arg(&definition)
        .arg("--morphology")
        .arg(&morphology)
        .assert()
        .success()
        .stdout(predicate::str::contains("Check OK"));
}

#[test]
fn check_fails_on_unresolved_sections() {
    let dir = tempfile::tempdir().unwrap();
    let morphology = write_file(&dir, "cell.swc", MORPHOLOGY);
    // No cable type covers the dendrite, and defaults are off.
    let definition = write_file(
        &dir,
        "model.toml",
        "[cable_types.soma.cable]\nRa = 10.0\ncm = 1.0\n",
    );

    arbz()
        .arg("check")
        .arg(&definition)
        .arg("--morphology")
        .arg(&morphology)
        .assert()
        .failure();
}

#[test]
fn build_neuron_emits_a_json_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let morphology = write_file(&dir, "cell.swc", MORPHOLOGY);
    let definition = write_file(&dir, "model.toml", DEFINITION);
    let output = dir.path().join("artifacts").join("cell.json");

    arbz()
        .arg("build")
        .arg("neuron")
        .arg("--definition")
        .arg(&definition)
        .arg("--morphology")
        .arg(&morphology)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let artifact: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(artifact["backend"], "neuron");
    assert_eq!(artifact["sections"].as_array().unwrap().len(), 2);
    assert_eq!(artifact["sections"][0]["Ra"], 10.0);
}

#[test]
fn build_arbor_prints_paints() {
    let dir = tempfile::tempdir().unwrap();
    let morphology = write_file(&dir, "cell.swc", MORPHOLOGY);
    let definition = write_file(&dir, "model.toml", DEFINITION);

    arbz()
        .arg("build")
        .arg("arbor")
        .arg("--definition")
        .arg(&definition)
        .arg("--morphology")
        .arg(&morphology)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"backend\": \"arbor\""))
        .stdout(predicate::str::contains("(tag 0)"));
}

#[test]
fn catalog_lists_builtin_mechanisms() {
    arbz()
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("Density mechanisms:"))
        .stdout(predicate::str::contains("hh"))
        .stdout(predicate::str::contains("ExpSyn"));
}
