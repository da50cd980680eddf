use std::process::Command;

use assert_cmd::{cargo, prelude::*};
use predicates::prelude::*;
#[cfg(target_arch = "aarch64")]
use serial_test::file_serial;

#[test]
fn missing_command_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
  let mut cmd = Command::new(cargo::cargo_bin!());
  cmd.arg("--color=never");
  cmd
    .assert()
    .failure()
    .stderr(predicate::str::contains("<CMD>"));
  Ok(())
}

#[cfg(not(target_arch = "aarch64"))]
#[test]
fn unsupported_host_is_reported() -> Result<(), Box<dyn std::error::Error>> {
  let mut cmd = Command::new(cargo::cargo_bin!());
  cmd.arg("--color=never").arg("--").arg("true");
  cmd
    .assert()
    .failure()
    .stderr(predicate::str::contains("No register backend for architecture"));
  Ok(())
}

#[cfg(target_arch = "aarch64")]
#[test]
#[file_serial]
// ptbox is a subprocess of the test runner,
// keep it away from other tests that fork tracees.
fn traces_until_exit_group() -> Result<(), Box<dyn std::error::Error>> {
  let mut cmd = Command::new(cargo::cargo_bin!());
  cmd.arg("--color=never").arg("--").arg("true");
  cmd
    .assert()
    .success()
    .stderr(predicate::str::contains("[exec]"))
    .stderr(predicate::str::contains("exit#94("));
  Ok(())
}

#[cfg(target_arch = "aarch64")]
#[test]
#[file_serial]
fn forwards_exit_code() -> Result<(), Box<dyn std::error::Error>> {
  let mut cmd = Command::new(cargo::cargo_bin!());
  cmd.args(["--color=never", "-o", "-", "--", "sh", "-c", "exit 3"]);
  cmd
    .assert()
    .code(3)
    .stdout(predicate::str::contains("exit#94("));
  Ok(())
}
