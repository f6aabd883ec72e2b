//! Running the compiled binary
//!
//! Every invocation gets a fresh working directory so no stray
//! routeprobe.json or package.json is picked up, and the ROUTEPROBE_*
//! variables of the calling shell are removed.

use std::path::Path;
use std::process::Output;

use tempfile::TempDir;
use tokio::process::Command;

pub struct CliRun {
    pub workdir: TempDir,
}

impl CliRun {
    pub fn new() -> Self {
        CliRun {
            workdir: TempDir::new().expect("Failed to create working directory"),
        }
    }

    pub fn dir(&self) -> &Path {
        self.workdir.path()
    }

    /// Write a file into the working directory
    pub fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.workdir.path().join(name), contents)
            .expect("Failed to write file into working directory");
    }

    pub async fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_routeprobe"))
            .args(args)
            .current_dir(self.workdir.path())
            .env_remove("ROUTEPROBE_URL")
            .env_remove("ROUTEPROBE_ADMIN_TOKEN")
            .env("NO_COLOR", "1")
            .output()
            .await
            .expect("Failed to run routeprobe binary")
    }
}

impl Default for CliRun {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
