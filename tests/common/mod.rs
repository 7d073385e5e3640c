//! Shared testing utilities for agsync CLI tests.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TOKEN: &str = "test-token";

/// Testing harness providing an isolated home and work directory for CLI runs.
#[allow(dead_code)]
pub struct TestContext {
    root: TempDir,
    home: PathBuf,
    work_dir: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    /// Create a new isolated environment with no token file.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory for tests");
        let home = root.path().canonicalize().expect("Failed to resolve temp directory");
        let work_dir = home.join("work");
        fs::create_dir_all(&work_dir).expect("Failed to create test work directory");

        Self { root, home, work_dir }
    }

    /// Environment with a token file in the emulated `$HOME`.
    pub fn with_token() -> Self {
        let ctx = Self::new();
        fs::write(ctx.home().join(".agtoken"), format!("{}\n", TOKEN))
            .expect("Failed to write token file");
        ctx
    }

    /// Absolute path to the emulated `$HOME` directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Path to the directory used for CLI invocations.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Build a command for invoking the compiled `agsync` binary within the work directory.
    pub fn cli(&self) -> Command {
        self.cli_in(self.work_dir())
    }

    /// Build a command for invoking the compiled `agsync` binary within a custom directory.
    pub fn cli_in<P: AsRef<Path>>(&self, dir: P) -> Command {
        let mut cmd = Command::cargo_bin("agsync").expect("Failed to locate agsync binary");
        cmd.current_dir(dir.as_ref()).env("HOME", self.home()).env_remove("AGSYNC_LOG");
        cmd
    }

    /// `agsync` pointed at a mock grading service.
    pub fn cli_against(&self, server_url: &str) -> Command {
        let mut cmd = self.cli();
        cmd.args(["--base-url", &format!("{}/", server_url)]);
        cmd
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.work_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.work_dir.join(relative)).expect("Failed to read test file")
    }
}

/// JSON body of a freshly created project with default settings.
#[allow(dead_code)]
pub fn project_json(pk: i64, name: &str) -> serde_json::Value {
    serde_json::json!({
        "pk": pk,
        "name": name,
        "guests_can_submit": false,
        "soft_closing_time": null,
        "closing_time": null,
        "allow_late_days": false,
        "ultimate_submission_policy": "most_recent",
        "min_group_size": 1,
        "max_group_size": 1,
        "submission_limit_per_day": null,
        "allow_submissions_past_limit": true,
        "groups_combine_daily_submissions": false,
        "submission_limit_reset_time": "00:00:00",
        "submission_limit_reset_timezone": "UTC",
        "num_bonus_submissions": 0,
        "send_email_on_submission_received": false,
        "send_email_on_non_deferred_tests_finished": false,
        "use_honor_pledge": false,
        "honor_pledge_text": "",
        "total_submission_limit": null
    })
}
