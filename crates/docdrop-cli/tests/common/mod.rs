//! Shared test utilities for docdrop-cli integration tests.

use std::path::Path;

use assert_cmd::Command;

/// Get a Command for the docdrop binary.
///
/// # Panics
///
/// Panics if the docdrop binary cannot be found. This should not happen
/// in a properly configured test environment.
#[allow(deprecated)]
pub fn docdrop_cmd() -> Command {
    Command::cargo_bin("docdrop").expect("docdrop binary should exist")
}

/// docdrop command isolated from the user's config and environment.
///
/// `home` stands in for the home directory so no real
/// `~/.docdrop/config.yaml` is picked up.
pub fn isolated_cmd(home: &Path, workspace: &Path) -> Command {
    let mut cmd = docdrop_cmd();
    cmd.env("HOME", home)
        .env_remove("DOCDROP_CONFIG")
        .env_remove("DOCDROP_SERVER")
        .env_remove("DOCDROP_TOKEN")
        .env_remove("DOCDROP_WORKSPACE")
        .env("NO_COLOR", "1")
        .arg("--workspace")
        .arg(workspace);
    cmd
}
