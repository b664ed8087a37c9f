// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for integration tests.

use std::path::Path;
use std::sync::OnceLock;

/// Cached result of Docker availability check.
#[allow(dead_code)]
static DOCKER_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Checks if Docker is available on the system.
///
/// This check is cached after the first call.
#[allow(dead_code)]
pub fn is_docker_available() -> bool {
    *DOCKER_AVAILABLE.get_or_init(|| {
        std::process::Command::new("docker")
            .args(["ps"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    })
}

/// Prints a warning message that a test is skipped due to Docker being unavailable.
#[allow(dead_code)]
pub fn print_docker_unavailable_warning(test_name: &str) {
    eprintln!("\n⚠️  SKIPPED: {} - Docker is not available", test_name);
    eprintln!("   To run this test, ensure Docker is installed and running.");
    eprintln!("   Installation: https://docs.docker.com/get-docker/\n");
}

/// Writes `content` to `root/reference/path`, creating directories.
#[allow(dead_code)]
pub fn write_document(root: &Path, reference: &str, path: &str, content: &str) {
    let target = root.join(reference).join(path);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(target, content).unwrap();
}
