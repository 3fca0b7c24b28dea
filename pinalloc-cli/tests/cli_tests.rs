//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::PathBuf;

/// Build command for the pinalloc binary (finds it in target/debug when run via cargo test).
fn pinalloc_cli() -> Command {
    cargo_bin_cmd!("pinalloc")
}

/// Path to pinalloc library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("pinalloc")
        .join("tests")
        .join("fixtures")
}

fn solve(features: &str) -> Command {
    let mut cmd = pinalloc_cli();
    cmd.arg("solve")
        .arg("--mcu")
        .arg(fixtures_dir().join("stm32f303k8.xml"))
        .arg("--features")
        .arg(fixtures_dir().join(features))
        .arg("--unknown")
        .arg("strict");
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = pinalloc_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pin allocation"));
}

#[test]
fn test_cli_version() {
    let mut cmd = pinalloc_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_solve_board() {
    solve("board.txt")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("console (USART"))
        .stdout(predicate::str::contains("debug (SYS1)"))
        .stdout(predicate::str::contains("  SWDIO = PA13"))
        .stdout(predicate::str::contains("  SWCLK = PA14"));
}

#[test]
fn test_cli_solve_json_output() {
    let output = solve("board.txt").arg("--format").arg("json").output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["mcu"], "STM32F303K8Tx");
    assert_eq!(json["features"].as_array().map(Vec::len), Some(8));
    assert_eq!(json["features"][1]["peripheral"], "SYS");
    assert_eq!(json["features"][1]["bindings"][0]["pin"], "PA13");
    assert_eq!(json["features"][1]["bindings"][0]["position"], 23);
    assert!(json["stats"]["decisions"].is_u64());
    assert!(json["generated_at"].is_string());
}

#[test]
fn test_cli_infeasible_exit_code() {
    solve("too_many_uarts.txt")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error: Infeasible"));
}

#[test]
fn test_cli_presolve_diagnosis() {
    solve("usb.txt")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no pin offers USB.DM"));

    solve("usb.txt").arg("--no-presolve").assert().code(2);
}

#[test]
fn test_cli_indeterminate_exit_code() {
    solve("board.txt")
        .arg("--max-decisions")
        .arg("0")
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("decision limit"));
}

#[test]
fn test_cli_timeout_exit_code() {
    solve("board.txt")
        .arg("--timeout-ms")
        .arg("0")
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("time limit of 0 ms reached"));
}

#[test]
fn test_cli_input_errors() {
    let mut cmd = pinalloc_cli();
    cmd.arg("solve")
        .arg("--mcu")
        .arg("does_not_exist.xml")
        .arg("--features")
        .arg(fixtures_dir().join("board.txt"))
        .arg("--unknown")
        .arg("strict");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Error"));

    solve("bad_declarations.txt")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ZIGBEE"));
}

#[test]
fn test_cli_unknown_policy_is_required() {
    let mut cmd = pinalloc_cli();
    cmd.arg("solve")
        .arg("--mcu")
        .arg(fixtures_dir().join("stm32f303k8.xml"))
        .arg("--features")
        .arg(fixtures_dir().join("board.txt"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--unknown"));
}

#[test]
fn test_cli_lenient_policy() {
    let mut features = tempfile::NamedTempFile::new().unwrap();
    writeln!(features, "console uses USART(TX)").unwrap();
    writeln!(features, "radio uses ZIGBEE(TX)").unwrap();

    let mut cmd = pinalloc_cli();
    cmd.arg("solve")
        .arg("--mcu")
        .arg(fixtures_dir().join("stm32_with_unknowns.xml"))
        .arg("--features")
        .arg(features.path())
        .arg("--unknown")
        .arg("lenient");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("console (USART"))
        .stdout(predicate::str::contains("radio").not());
}

#[test]
fn test_cli_pins_command() {
    let mut cmd = pinalloc_cli();
    cmd.arg("pins")
        .arg("--mcu")
        .arg(fixtures_dir().join("stm32f303k8.xml"))
        .arg("--unknown")
        .arg("strict");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("STM32F303K8Tx (25 I/O pins)"))
        .stdout(predicate::str::contains("USART1_TX"));

    let mut cmd = pinalloc_cli();
    cmd.arg("pins")
        .arg("--mcu")
        .arg(fixtures_dir().join("stm32_with_unknowns.xml"))
        .arg("--unknown")
        .arg("lenient");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Dropped signals"))
        .stdout(predicate::str::contains("EVENTOUT"));
}

#[test]
fn test_cli_peripherals_command() {
    let mut cmd = pinalloc_cli();

    cmd.arg("peripherals").arg("--channels");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("USART"))
        .stdout(predicate::str::contains("TX, RX"))
        .stdout(predicate::str::contains("GPIO   instances shared"));
}

#[test]
fn test_cli_verbose_is_logging_on_every_command() {
    let mut cmd = pinalloc_cli();

    cmd.arg("peripherals").arg("-v");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("USART"))
        .stdout(predicate::str::contains("channels:").not());
}

#[test]
fn test_cli_output_formats_are_different() {
    let human_output = solve("board.txt").arg("--format").arg("human").output().unwrap();
    let json_output = solve("board.txt").arg("--format").arg("json").output().unwrap();

    assert_ne!(
        human_output.stdout,
        json_output.stdout,
        "Different formats should produce different output"
    );
}
