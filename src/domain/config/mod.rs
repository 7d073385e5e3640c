//! The project config document: schema, defaults and local validation.

mod deadline;
mod feedback;
mod files;
mod project;
mod repeat;
mod settings;
mod test_case;
mod test_suite;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::AppError;

pub use deadline::{CutoffPreference, Deadline, from_remote_window, to_remote_window};
pub use feedback::{
    BUILTIN_COMMAND_PRESETS, BUILTIN_SUITE_PRESETS, CommandFeedbackConfig, FeedbackSetting,
    PresetTable, SuiteFeedbackConfig, TestCaseFeedbackConfig, ValueFeedbackLevel,
    command_setting_for, suite_setting_for,
};
pub use files::{ExpectedStudentFile, InstructorFileConfig};
pub use project::{CourseSelection, ProjectConfig, Semester};
pub use repeat::{OVERRIDE_KEY, Substitution, apply_substitutions};
pub use settings::{EmailReceipts, ProjectSettings, UltimateSubmissionPolicy};
pub use test_case::{
    CommandConfig, CommandFeedbackSettings, DiffOptions, ExpectedOutputSource, ExpectedReturnCode,
    MultiCommandTestCase, OutputCheck, OutputCheckWithDeduction, ResourceLimits, ReturnCodeCheck,
    ReturnCodeCheckWithDeduction, SingleCommandTestCase, StdinSettings, StdinSource,
    TestCaseConfig, TestCaseFeedbackSettings,
};
pub use test_suite::{DEFAULT_SANDBOX_IMAGE, TestSuiteConfig};

/// Top-level config document, usually `ag_project.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgConfig {
    pub project: ProjectConfig,
    /// Command feedback presets; entries named like a builtin replace it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feedback_presets: BTreeMap<String, CommandFeedbackConfig>,
    /// Suite setup feedback presets; entries named like a builtin replace it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feedback_presets_test_suite_setup: BTreeMap<String, SuiteFeedbackConfig>,
    /// Sandbox image build descriptions. Recorded only; images are not built.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub docker_images: BTreeMap<String, DockerImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockerImage {
    pub build_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<PathBuf>,
}

impl AgConfig {
    pub fn new(project: ProjectConfig) -> Self {
        Self {
            project,
            feedback_presets: BTreeMap::new(),
            feedback_presets_test_suite_setup: BTreeMap::new(),
            docker_images: BTreeMap::new(),
        }
    }

    pub fn parse_str(content: &str) -> Result<Self, AppError> {
        serde_yaml::from_str(content)
            .map_err(|err| AppError::config_error(format!("Invalid project config: {}", err)))
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).map_err(|err| {
            AppError::config_error(format!("Failed to read {}: {}", path.display(), err))
        })?;
        Self::parse_str(&content)
    }

    pub fn to_yaml_string(&self) -> Result<String, AppError> {
        serde_yaml::to_string(self)
            .map_err(|err| AppError::config_error(format!("Failed to serialize config: {}", err)))
    }

    pub fn write_to(&self, path: &Path) -> Result<(), AppError> {
        fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    /// Builtin presets merged with this document's own.
    pub fn presets(&self) -> PresetTable {
        PresetTable::new(&self.feedback_presets, &self.feedback_presets_test_suite_setup)
    }

    /// Every check that can run without the grading service.
    pub fn validate(&self) -> Result<(), AppError> {
        let project = &self.project;
        project.settings.validate()?;

        let mut patterns = HashSet::new();
        for file in &project.student_files {
            file.validate()?;
            if !patterns.insert(file.pattern()) {
                return Err(AppError::config_error(format!(
                    "Duplicate student file \"{}\"",
                    file.pattern()
                )));
            }
        }

        let mut names = HashSet::new();
        for file in &project.instructor_files {
            file.validate()?;
            if !names.insert(file.name()) {
                return Err(AppError::config_error(format!(
                    "Duplicate instructor file name \"{}\"",
                    file.name()
                )));
            }
        }

        let presets = self.presets();
        let mut suite_names = HashSet::new();
        for suite in &project.test_suites {
            if !suite_names.insert(suite.name.as_str()) {
                return Err(AppError::config_error(format!(
                    "Duplicate test suite name \"{}\"",
                    suite.name
                )));
            }
            for setting in suite.feedback_settings() {
                presets.suite(setting)?;
            }

            for test in suite.expanded_test_cases()? {
                match &test {
                    TestCaseConfig::Single(single) => {
                        single.validate()?;
                        for setting in single.feedback.settings() {
                            presets.command(setting)?;
                        }
                    }
                    TestCaseConfig::Multi(multi) => {
                        multi.validate()?;
                        for command in &multi.commands {
                            for setting in command.feedback.settings() {
                                presets.command(setting)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn is_true(value: &bool) -> bool {
    *value
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

pub(crate) fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
project:
  name: Project 1
  timezone: America/Detroit
  course:
    name: EECS 280
    semester: Fall
    year: 2024
  settings:
    deadline:
      cutoff_type: fixed
      deadline: Jan 15, 2024 11:59PM
      cutoff: Jan 16, 2024 11:59PM
    send_email_receipts: on_finish
  student_files:
    - hello.py
    - pattern: test_*.py
      min_num_matches: 0
      max_num_matches: 3
  instructor_files:
    - local_path: instructor_file.txt
  test_suites:
    - name: Suite 1
      instructor_files_needed: [instructor_file.txt]
      student_files_needed: [hello.py]
      test_cases:
        - name: Test $N
          cmd: python3 hello.py $N
          feedback:
            normal_fdbk_config: pass/fail+diff
          repeat:
            - $N: 1
            - $N: 2
        - name: Test multi
          type: multi_cmd
          commands:
            - name: step
              cmd: echo hi
feedback_presets:
  quiet:
    visible: false
    show_student_description: false
    return_code_fdbk_level: no_feedback
    stdout_fdbk_level: no_feedback
    stderr_fdbk_level: no_feedback
    show_points: false
    show_actual_return_code: false
    show_actual_stdout: false
    show_actual_stderr: false
    show_whether_timed_out: false
"#;

    #[test]
    fn sample_document_parses_and_validates() {
        let config = AgConfig::parse_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.project.student_files.len(), 2);
        assert_eq!(config.project.instructor_files[0].name(), "instructor_file.txt");
        assert_eq!(config.project.settings.send_email_receipts, EmailReceipts::OnFinish);
        assert_eq!(config.project.test_suites[0].expanded_test_cases().unwrap().len(), 3);
        assert!(config.presets().command(&FeedbackSetting::preset("quiet")).is_ok());
    }

    #[test]
    fn written_document_reparses_identically() {
        let config = AgConfig::parse_str(SAMPLE).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("ag_project.yml");

        config.write_to(&path).unwrap();
        assert_eq!(AgConfig::from_path(&path).unwrap(), config);
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let err = AgConfig::parse_str("project: {}\nextras: 1\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn unknown_preset_fails_validation() {
        let broken = SAMPLE.replace("pass/fail+diff", "pass/fail+everything");
        let err = AgConfig::parse_str(&broken).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("pass/fail+everything"));
    }

    #[test]
    fn duplicate_suites_fail_validation() {
        let mut config = AgConfig::parse_str(SAMPLE).unwrap();
        let copy = config.project.test_suites[0].clone();
        config.project.test_suites.push(copy);
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_student_patterns_fail_validation() {
        let mut config = AgConfig::parse_str(SAMPLE).unwrap();
        config.project.student_files.push(ExpectedStudentFile::exact("hello.py"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let err = AgConfig::from_path(&dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
