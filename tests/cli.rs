use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp file");
    tmp.write_all(contents.as_bytes()).expect("write temp file");
    tmp
}

#[test]
fn headless_run_prints_rest_state() {
    let mut cmd = Command::cargo_bin("crane-sim").expect("binary exists");
    cmd.arg("--headless");
    cmd.assert()
        .success()
        .stdout(contains("Loaded rig with 7 parts (2 props)"))
        .stdout(contains("Final crane state:"))
        .stdout(contains(
            "Status: Boom: 63% | Cable: 5.0 | Rotation: 0° | Trolley: 0.0",
        ))
        .stdout(contains(" - hook pos=(10.00, 7.50, 0.00)"));
}

#[test]
fn headless_script_slews_the_platform() {
    let script = write_temp(
        "# hold a for fifty frames\n\
         down a\n\
         tick 50\n\
         up a\n\
         print\n",
    );
    let mut cmd = Command::cargo_bin("crane-sim").expect("binary exists");
    cmd.arg("--headless").arg("--script").arg(script.path());
    cmd.assert()
        .success()
        .stdout(contains("Replaying script (50 ticks)"))
        .stdout(contains("Boom: 63% | Cable: 5.0 | Rotation: 57° | Trolley: 0.0"))
        .stdout(contains("Final crane state:"));
}

#[test]
fn rig_file_limits_trolley_travel() {
    let rig = write_temp(
        r#"<rig>
  <part><name>boom</name><rail>2</rail></part>
  <part><name>mast-light</name><offset>0 25 0</offset></part>
</rig>
"#,
    );
    let script = write_temp("down arrowright\ntick 50\n");
    let mut cmd = Command::cargo_bin("crane-sim").expect("binary exists");
    cmd.arg("--rig")
        .arg(rig.path())
        .arg("--script")
        .arg(script.path())
        .arg("--headless");
    cmd.assert()
        .success()
        .stdout(contains("Loaded rig with 8 parts (3 props)"))
        .stdout(contains("Trolley: 5.0"))
        .stdout(contains(" - hook pos=(12.00, 7.50, 0.00)"));
}

#[test]
fn bad_script_reports_the_line() {
    let script = write_temp("down q\nhoist 3\n");
    let mut cmd = Command::cargo_bin("crane-sim").expect("binary exists");
    cmd.arg("--headless").arg("--script").arg(script.path());
    cmd.assert()
        .failure()
        .stderr(contains("Error:"))
        .stderr(contains("line 2"));
}

#[test]
fn help_prints_usage_and_controls() {
    let mut cmd = Command::cargo_bin("crane-sim").expect("binary exists");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(contains("Usage: crane-sim"))
        .stdout(contains("arrowright  trolley out"))
        .stdout(contains("q           raise boom"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("crane-sim").expect("binary exists");
    cmd.arg("--summary-only");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("Unknown argument: --summary-only"));
}
