//! Wire representations of the grading service's resources.
//!
//! Timestamps stay as RFC 3339 strings here; conversion to project wall-clock time happens
//! in the commands that read or write them.

use serde::{Deserialize, Serialize};

use crate::domain::config::{
    CommandFeedbackConfig, ExpectedOutputSource, ExpectedReturnCode, StdinSource,
    SuiteFeedbackConfig, TestCaseFeedbackConfig,
};

/// Remote primary key.
pub type Pk = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub pk: Pk,
    pub name: String,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub pk: Pk,
    pub name: String,
    #[serde(flatten)]
    pub settings: ProjectSettingsBody,
}

/// Every project setting the config document controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettingsBody {
    pub guests_can_submit: bool,
    #[serde(default)]
    pub soft_closing_time: Option<String>,
    #[serde(default)]
    pub closing_time: Option<String>,
    pub allow_late_days: bool,
    pub ultimate_submission_policy: String,
    pub min_group_size: u32,
    pub max_group_size: u32,
    #[serde(default)]
    pub submission_limit_per_day: Option<u32>,
    pub allow_submissions_past_limit: bool,
    pub groups_combine_daily_submissions: bool,
    /// `HH:MM:SS`.
    pub submission_limit_reset_time: String,
    pub submission_limit_reset_timezone: String,
    pub num_bonus_submissions: u32,
    pub send_email_on_submission_received: bool,
    pub send_email_on_non_deferred_tests_finished: bool,
    pub use_honor_pledge: bool,
    pub honor_pledge_text: String,
    #[serde(default)]
    pub total_submission_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFileBody {
    pub pattern: String,
    pub min_num_matches: u32,
    pub max_num_matches: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFile {
    pub pk: Pk,
    #[serde(flatten)]
    pub body: StudentFileBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorFile {
    pub pk: Pk,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxImage {
    pub pk: Pk,
    pub display_name: String,
    #[serde(default)]
    pub name: String,
    /// Argument passed to `docker pull`.
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSandboxImage {
    pub name: String,
    pub display_name: String,
    pub tag: String,
}

/// Partial image update; unset fields are left alone remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxImagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl SandboxImagePatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.tag.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCopyBody {
    pub new_name: String,
    pub new_semester: String,
    pub new_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuiteBody {
    pub name: String,
    pub instructor_files_needed: Vec<InstructorFile>,
    pub read_only_instructor_files: bool,
    pub student_files_needed: Vec<StudentFile>,
    pub allow_network_access: bool,
    pub deferred: bool,
    #[serde(default)]
    pub sandbox_docker_image: Option<SandboxImage>,
    pub setup_suite_cmd: String,
    pub setup_suite_cmd_name: String,
    pub reject_submission_if_setup_fails: bool,
    pub normal_fdbk_config: SuiteFeedbackConfig,
    pub ultimate_submission_fdbk_config: SuiteFeedbackConfig,
    pub past_limit_submission_fdbk_config: SuiteFeedbackConfig,
    pub staff_viewer_fdbk_config: SuiteFeedbackConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub pk: Pk,
    #[serde(flatten)]
    pub body: TestSuiteBody,
    #[serde(default)]
    pub ag_test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseBody {
    pub name: String,
    pub internal_admin_notes: String,
    pub staff_description: String,
    pub student_description: String,
    pub normal_fdbk_config: TestCaseFeedbackConfig,
    pub ultimate_submission_fdbk_config: TestCaseFeedbackConfig,
    pub past_limit_submission_fdbk_config: TestCaseFeedbackConfig,
    pub staff_viewer_fdbk_config: TestCaseFeedbackConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub pk: Pk,
    #[serde(flatten)]
    pub body: TestCaseBody,
    #[serde(default)]
    pub ag_test_commands: Vec<TestCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandBody {
    pub name: String,
    pub cmd: String,
    pub internal_admin_notes: String,
    pub staff_description: String,
    pub student_description: String,
    pub student_on_fail_description: String,

    pub stdin_source: StdinSource,
    pub stdin_text: String,
    pub stdin_instructor_file: Option<InstructorFile>,

    pub expected_return_code: ExpectedReturnCode,
    pub points_for_correct_return_code: i32,
    pub deduction_for_wrong_return_code: i32,

    pub expected_stdout_source: ExpectedOutputSource,
    pub expected_stdout_text: String,
    pub expected_stdout_instructor_file: Option<InstructorFile>,
    pub points_for_correct_stdout: i32,
    pub deduction_for_wrong_stdout: i32,

    pub expected_stderr_source: ExpectedOutputSource,
    pub expected_stderr_text: String,
    pub expected_stderr_instructor_file: Option<InstructorFile>,
    pub points_for_correct_stderr: i32,
    pub deduction_for_wrong_stderr: i32,

    pub ignore_case: bool,
    pub ignore_whitespace: bool,
    pub ignore_whitespace_changes: bool,
    pub ignore_blank_lines: bool,

    pub normal_fdbk_config: CommandFeedbackConfig,
    pub first_failed_test_normal_fdbk_config: Option<CommandFeedbackConfig>,
    pub ultimate_submission_fdbk_config: CommandFeedbackConfig,
    pub past_limit_submission_fdbk_config: CommandFeedbackConfig,
    pub staff_viewer_fdbk_config: CommandFeedbackConfig,

    pub time_limit: u32,
    pub use_virtual_memory_limit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_memory_limit: Option<u64>,
    pub block_process_spawn: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCommand {
    pub pk: Pk,
    #[serde(flatten)]
    pub body: CommandBody,
}
