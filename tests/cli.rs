// End-to-end runs of the tessitura binary with real worker processes

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::tempdir;

fn tessitura() -> Command {
    let mut cmd = Command::cargo_bin("tessitura").unwrap();
    for var in [
        "TESSITURA_WORKERS",
        "TESSITURA_SLOW",
        "TESSITURA_UNIT_TIMEOUT",
        "TESSITURA_RUN_TIMEOUT",
        "TESSITURA_BOOST",
        "TESSITURA_VERBOSE",
        "TESSITURA_CONFIG",
        "TESSITURA_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn passing_run_is_silent() {
    tessitura()
        .args(["run", "--workers", "2"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn passing_ci_exits_zero() {
    tessitura()
        .args(["ci", "--workers", "3", "--slow"])
        .assert()
        .code(0)
        .stdout("");
}

#[test]
fn failing_ci_reports_every_failure() {
    tessitura()
        .args(["ci", "--suite", "faults", "--workers", "2"])
        .assert()
        .code(1)
        .stdout(
            contains("6 of 9 units did not pass")
                .and(contains("FAIL crash::test_wrong_pitch"))
                .and(contains("ERROR crash::test_abort_worker"))
                .and(contains("worker failure"))
                .and(contains("ERROR broken::<load>"))
                .and(contains("missing dependency 'tuning'"))
                .and(contains("FAIL arith::add::example_2"))
                .and(contains("\"3\" != \"4\""))
                .and(contains("Total: 9 | Pass: 3 | Fail: 2 | Error: 4"))
                .and(contains("crash::test_chatty").not()),
        );
}

#[test]
fn stray_worker_output_is_logged() {
    tessitura()
        .args(["ci", "--suite", "faults", "test_chatty"])
        .assert()
        .code(0)
        .stdout("")
        .stderr(contains("[crash::test_chatty]: tuning up"));
}

#[test]
fn failing_run_still_exits_zero() {
    tessitura()
        .args(["run", "--suite", "faults", "--unit-timeout", "2", "crash"])
        .assert()
        .success()
        .stdout(
            contains("did not pass")
                .and(contains("crash::test_missing_fixture"))
                .and(contains("crash::test_hangs")),
        );
}

#[test]
fn hanging_unit_times_out() {
    tessitura()
        .args([
            "ci",
            "--suite",
            "faults",
            "--slow",
            "--unit-timeout",
            "1",
            "test_hangs",
        ])
        .assert()
        .code(1)
        .stdout(contains("ERROR crash::test_hangs").and(contains("timed out after 1s")));
}

#[test]
fn verbose_prints_passing_units() {
    tessitura()
        .args(["run", "--verbose", "pitch"])
        .assert()
        .success()
        .stdout(contains("ok pitch::test_middle_c (").and(contains("ok pitch::midi_number::example_3 (")));
}

#[test]
fn external_unit_runs_only_when_named() {
    tessitura()
        .args(["ci", "--verbose"])
        .assert()
        .success()
        .stdout(contains("ok pitch::test_middle_c (").and(contains("test_write_scale_file").not()));

    tessitura()
        .args(["ci", "--verbose", "pitch::test_write_scale_file"])
        .assert()
        .success()
        .stdout(contains("ok pitch::test_write_scale_file ("));
}

#[test]
fn list_hides_units_a_default_run_skips() {
    tessitura()
        .arg("list")
        .assert()
        .success()
        .stdout(
            contains("pitch::test_middle_c")
                .and(contains("interval::interval_name::example_2"))
                .and(contains("pitch::test_frequencies_increase").not())
                .and(contains("pitch::test_write_scale_file").not()),
        );

    tessitura()
        .args(["list", "--all"])
        .assert()
        .success()
        .stdout(
            contains("pitch::test_frequencies_increase")
                .and(contains("slow"))
                .and(contains("pitch::test_write_scale_file"))
                .and(contains("external")),
        );
}

#[test]
fn report_file_is_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reports").join("run.json");

    tessitura()
        .args(["ci", "--suite", "faults", "arith", "--output"])
        .arg(&path)
        .assert()
        .code(1);

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(report["total"], 3);
    assert_eq!(report["passed"], 2);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["exit_code"], 1);
}

#[test]
fn documentation_directory_units_run() {
    let dir = tempdir().unwrap();
    let docs = dir.path().join("guide");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("arithmetic.txt"), ">>> 2 * 3\n6\n\n>>> 2 * 3\n7\n").unwrap();

    tessitura()
        .args(["ci", "guide.arithmetic", "--docs"])
        .arg(&docs)
        .assert()
        .code(1)
        .stdout(
            contains("FAIL guide.arithmetic::doc::example_2")
                .and(contains("1 of 2 units did not pass")),
        );
}

#[test]
fn zero_workers_is_a_harness_error() {
    tessitura()
        .args(["ci", "--workers", "0"])
        .assert()
        .code(2)
        .stderr(contains("workers must be at least 1"));
}

#[test]
fn config_file_settings_apply() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tessitura.yaml");
    fs::write(&path, "include_slow: true\nworkers: 2\nverbose: true\n").unwrap();

    tessitura()
        .args(["run", "pitch", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("ok pitch::test_octave_doubling_everywhere ("));
}

#[test]
fn environment_overrides_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tessitura.yaml");
    fs::write(&path, "workers: 2\n").unwrap();

    tessitura()
        .args(["ci", "--config"])
        .arg(&path)
        .env("TESSITURA_WORKERS", "0")
        .assert()
        .code(2)
        .stderr(contains("workers must be at least 1"));
}

#[test]
fn flags_override_unusable_config_file_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tessitura.yaml");
    fs::write(&path, "workers: 0\n").unwrap();

    tessitura()
        .args(["ci", "pitch::test_middle_c", "--workers", "2", "--config"])
        .arg(&path)
        .assert()
        .code(0)
        .stdout("");
}
