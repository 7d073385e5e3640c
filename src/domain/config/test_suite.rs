use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::feedback::{FeedbackSetting, PUBLIC, SuiteFeedbackConfig};
use super::test_case::TestCaseConfig;
use super::{default_true, is_false, is_true};
use crate::domain::AppError;

pub const DEFAULT_SANDBOX_IMAGE: &str = "Default";
pub const DEFAULT_SETUP_CMD: &str =
    "echo \"Configure your setup command here. Set to empty string to not use a setup command\"";
pub const DEFAULT_SETUP_CMD_NAME: &str = "Setup";

/// A named group of test cases sharing a sandbox and setup command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSuiteConfig {
    pub name: String,

    /// Instructor file names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructor_files_needed: Vec<String>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub read_only_instructor_files: bool,
    /// Student file patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub student_files_needed: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_network_access: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deferred: bool,
    /// Sandbox image display name.
    #[serde(default = "default_sandbox_image", skip_serializing_if = "is_default_sandbox_image")]
    pub sandbox_docker_image: String,

    #[serde(default = "default_setup_cmd", skip_serializing_if = "is_default_setup_cmd")]
    pub setup_suite_cmd: String,
    #[serde(default = "default_setup_cmd_name", skip_serializing_if = "is_default_setup_cmd_name")]
    pub setup_suite_cmd_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reject_submission_if_setup_fails: bool,

    #[serde(default = "public", skip_serializing_if = "is_public")]
    pub normal_fdbk_config: FeedbackSetting<SuiteFeedbackConfig>,
    #[serde(default = "public", skip_serializing_if = "is_public")]
    pub ultimate_submission_fdbk_config: FeedbackSetting<SuiteFeedbackConfig>,
    #[serde(default = "public", skip_serializing_if = "is_public")]
    pub past_limit_submission_fdbk_config: FeedbackSetting<SuiteFeedbackConfig>,
    #[serde(default = "public", skip_serializing_if = "is_public")]
    pub staff_viewer_fdbk_config: FeedbackSetting<SuiteFeedbackConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_cases: Vec<TestCaseConfig>,
}

impl TestSuiteConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            instructor_files_needed: Vec::new(),
            read_only_instructor_files: true,
            student_files_needed: Vec::new(),
            allow_network_access: false,
            deferred: false,
            sandbox_docker_image: default_sandbox_image(),
            setup_suite_cmd: default_setup_cmd(),
            setup_suite_cmd_name: default_setup_cmd_name(),
            reject_submission_if_setup_fails: false,
            normal_fdbk_config: public(),
            ultimate_submission_fdbk_config: public(),
            past_limit_submission_fdbk_config: public(),
            staff_viewer_fdbk_config: public(),
            test_cases: Vec::new(),
        }
    }

    pub fn feedback_settings(&self) -> [&FeedbackSetting<SuiteFeedbackConfig>; 4] {
        [
            &self.normal_fdbk_config,
            &self.ultimate_submission_fdbk_config,
            &self.past_limit_submission_fdbk_config,
            &self.staff_viewer_fdbk_config,
        ]
    }

    /// All test cases after `repeat` expansion. Names must be unique within the suite.
    pub fn expanded_test_cases(&self) -> Result<Vec<TestCaseConfig>, AppError> {
        let mut expanded = Vec::new();
        for test in &self.test_cases {
            expanded.extend(test.do_repeat()?);
        }

        let mut seen = HashSet::new();
        for test in &expanded {
            if !seen.insert(test.name()) {
                return Err(AppError::config_error(format!(
                    "Duplicate test case name \"{}\" in suite \"{}\"",
                    test.name(),
                    self.name
                )));
            }
        }
        Ok(expanded)
    }
}

fn default_sandbox_image() -> String {
    DEFAULT_SANDBOX_IMAGE.to_string()
}

fn is_default_sandbox_image(value: &str) -> bool {
    value == DEFAULT_SANDBOX_IMAGE
}

fn default_setup_cmd() -> String {
    DEFAULT_SETUP_CMD.to_string()
}

fn is_default_setup_cmd(value: &str) -> bool {
    value == DEFAULT_SETUP_CMD
}

fn default_setup_cmd_name() -> String {
    DEFAULT_SETUP_CMD_NAME.to_string()
}

fn is_default_setup_cmd_name(value: &str) -> bool {
    value == DEFAULT_SETUP_CMD_NAME
}

fn public() -> FeedbackSetting<SuiteFeedbackConfig> {
    FeedbackSetting::preset(PUBLIC)
}

fn is_public(value: &FeedbackSetting<SuiteFeedbackConfig>) -> bool {
    value.is_preset(PUBLIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_only_suite_takes_defaults() {
        let suite: TestSuiteConfig = serde_yaml::from_str("name: Suite 1\n").unwrap();
        assert_eq!(suite, TestSuiteConfig::new("Suite 1"));
        assert!(suite.read_only_instructor_files);
        assert_eq!(suite.sandbox_docker_image, "Default");
        assert_eq!(suite.setup_suite_cmd_name, "Setup");
        assert!(suite.feedback_settings().iter().all(|setting| setting.is_preset("public")));
    }

    #[test]
    fn default_suite_serializes_to_name_only() {
        let yaml = serde_yaml::to_string(&TestSuiteConfig::new("Suite 1")).unwrap();
        assert_eq!(yaml, "name: Suite 1\n");
    }

    #[test]
    fn duplicate_expanded_names_are_rejected() {
        let suite: TestSuiteConfig = serde_yaml::from_str(
            "name: s\ntest_cases:\n  - name: Test 1\n    cmd: a\n  - name: Test $N\n    cmd: b\n    repeat:\n      - $N: 1\n",
        )
        .unwrap();
        let err = suite.expanded_test_cases().unwrap_err();
        assert!(err.to_string().contains("Duplicate test case name \"Test 1\""));
    }

    #[test]
    fn expansion_preserves_declaration_order() {
        let suite: TestSuiteConfig = serde_yaml::from_str(
            "name: s\ntest_cases:\n  - name: first\n    cmd: a\n  - name: rep $N\n    cmd: b\n    repeat:\n      - $N: 1\n      - $N: 2\n  - name: last\n    type: multi_cmd\n",
        )
        .unwrap();
        let names: Vec<_> = suite
            .expanded_test_cases()
            .unwrap()
            .iter()
            .map(|test| test.name().to_string())
            .collect();
        assert_eq!(names, ["first", "rep 1", "rep 2", "last"]);
    }
}
