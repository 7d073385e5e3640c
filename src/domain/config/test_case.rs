//! Test cases, their commands and the command-level check settings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use super::feedback::{
    CommandFeedbackConfig, FeedbackSetting, PASS_FAIL, PRIVATE, PUBLIC, TestCaseFeedbackConfig,
};
use super::repeat::{self, Substitution};
use super::{is_default, is_false};
use crate::domain::AppError;

const SINGLE_COMMAND_FIELDS: &[&str] = &[
    "name",
    "type",
    "internal_admin_notes",
    "staff_description",
    "student_description",
    "student_on_fail_description",
    "cmd",
    "input",
    "return_code",
    "stdout",
    "stderr",
    "diff_options",
    "feedback",
    "resources",
    "repeat",
];

const MULTI_COMMAND_FIELDS: &[&str] = &[
    "name",
    "type",
    "internal_admin_notes",
    "staff_description",
    "student_description",
    "feedback",
    "commands",
    "repeat",
];

const COMMAND_FIELDS: &[&str] = &[
    "name",
    "cmd",
    "input",
    "return_code",
    "stdout",
    "stderr",
    "diff_options",
    "feedback",
    "resources",
    "repeat",
];

/// A test case: one command, or several commands with test-level feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TestCaseConfig {
    Single(SingleCommandTestCase),
    Multi(MultiCommandTestCase),
}

impl TestCaseConfig {
    pub fn name(&self) -> &str {
        match self {
            TestCaseConfig::Single(test) => &test.name,
            TestCaseConfig::Multi(test) => &test.name,
        }
    }

    /// Expand `repeat` into concrete test cases. Without `repeat` the test is returned as-is.
    pub fn do_repeat(&self) -> Result<Vec<TestCaseConfig>, AppError> {
        match self {
            TestCaseConfig::Single(test) => {
                Ok(test.do_repeat()?.into_iter().map(TestCaseConfig::Single).collect())
            }
            TestCaseConfig::Multi(test) => {
                Ok(test.do_repeat()?.into_iter().map(TestCaseConfig::Multi).collect())
            }
        }
    }
}

impl<'de> Deserialize<'de> for TestCaseConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let value = Value::deserialize(deserializer)?;
        let kind = match value.get("type") {
            None => "default".to_string(),
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(D::Error::custom(format!("Invalid test case type: {:?}", other)));
            }
        };

        match kind.as_str() {
            "default" | "single_cmd" => {
                serde_yaml::from_value(value).map(TestCaseConfig::Single).map_err(D::Error::custom)
            }
            "multi_cmd" => {
                serde_yaml::from_value(value).map(TestCaseConfig::Multi).map_err(D::Error::custom)
            }
            other => Err(D::Error::custom(format!(
                "Unknown test case type \"{}\". Expected \"default\", \"single_cmd\" or \"multi_cmd\"",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleCommandKind {
    #[default]
    Default,
    SingleCmd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiCommandKind {
    #[default]
    MultiCmd,
}

/// A test case with exactly one command, named like the test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SingleCommandTestCase {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "is_default")]
    pub kind: SingleCommandKind,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub internal_admin_notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub staff_description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub student_description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub student_on_fail_description: String,

    pub cmd: String,

    #[serde(default, skip_serializing_if = "is_default")]
    pub input: StdinSettings,
    #[serde(default, skip_serializing_if = "is_default")]
    pub return_code: ReturnCodeCheck,
    #[serde(default, skip_serializing_if = "is_default")]
    pub stdout: OutputCheck,
    #[serde(default, skip_serializing_if = "is_default")]
    pub stderr: OutputCheck,
    #[serde(default, skip_serializing_if = "is_default")]
    pub diff_options: DiffOptions,
    #[serde(default, skip_serializing_if = "is_default")]
    pub feedback: CommandFeedbackSettings,
    #[serde(default, skip_serializing_if = "is_default")]
    pub resources: ResourceLimits,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repeat: Vec<Substitution>,
}

impl SingleCommandTestCase {
    pub fn new(name: &str, cmd: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SingleCommandKind::Default,
            internal_admin_notes: String::new(),
            staff_description: String::new(),
            student_description: String::new(),
            student_on_fail_description: String::new(),
            cmd: cmd.to_string(),
            input: StdinSettings::default(),
            return_code: ReturnCodeCheck::default(),
            stdout: OutputCheck::default(),
            stderr: OutputCheck::default(),
            diff_options: DiffOptions::default(),
            feedback: CommandFeedbackSettings::default(),
            resources: ResourceLimits::default(),
            repeat: Vec::new(),
        }
    }

    pub fn do_repeat(&self) -> Result<Vec<SingleCommandTestCase>, AppError> {
        if self.repeat.is_empty() {
            return Ok(vec![self.clone()]);
        }

        self.repeat
            .iter()
            .map(|substitution| {
                let mut instance = self.clone();
                instance.repeat.clear();
                instance.name = repeat::apply_substitutions(&self.name, substitution)?;
                instance.cmd = repeat::apply_substitutions(&self.cmd, substitution)?;
                instance.input.instructor_file =
                    repeat::apply_to_optional(&self.input.instructor_file, substitution)?;
                instance.stdout.instructor_file =
                    repeat::apply_to_optional(&self.stdout.instructor_file, substitution)?;
                instance.stderr.instructor_file =
                    repeat::apply_to_optional(&self.stderr.instructor_file, substitution)?;
                repeat::apply_overrides(instance, substitution, SINGLE_COMMAND_FIELDS, &self.name)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_command_settings(
            &self.name,
            &self.input,
            [self.stdout.as_source(), self.stderr.as_source()],
        )
    }
}

/// A test case with test-level feedback and any number of named commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultiCommandTestCase {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: MultiCommandKind,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub internal_admin_notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub staff_description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub student_description: String,

    #[serde(default, skip_serializing_if = "is_default")]
    pub feedback: TestCaseFeedbackSettings,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repeat: Vec<Substitution>,
}

impl MultiCommandTestCase {
    pub fn new(name: &str, commands: Vec<CommandConfig>) -> Self {
        Self {
            name: name.to_string(),
            kind: MultiCommandKind::MultiCmd,
            internal_admin_notes: String::new(),
            staff_description: String::new(),
            student_description: String::new(),
            feedback: TestCaseFeedbackSettings::default(),
            commands,
            repeat: Vec::new(),
        }
    }

    /// Expand the test-level `repeat`, then every command's own `repeat`.
    pub fn do_repeat(&self) -> Result<Vec<MultiCommandTestCase>, AppError> {
        let instances = if self.repeat.is_empty() {
            vec![self.clone()]
        } else {
            self.repeat
                .iter()
                .map(|substitution| {
                    let mut instance = self.clone();
                    instance.repeat.clear();
                    instance.name = repeat::apply_substitutions(&self.name, substitution)?;
                    for command in &mut instance.commands {
                        command.substitute(substitution)?;
                    }
                    repeat::apply_overrides(
                        instance,
                        substitution,
                        MULTI_COMMAND_FIELDS,
                        &self.name,
                    )
                })
                .collect::<Result<Vec<_>, AppError>>()?
        };

        instances
            .into_iter()
            .map(|mut instance| {
                let mut commands = Vec::with_capacity(instance.commands.len());
                for command in &instance.commands {
                    commands.extend(command.do_repeat()?);
                }
                instance.commands = commands;
                Ok(instance)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let mut seen = std::collections::HashSet::new();
        for command in &self.commands {
            if !seen.insert(command.name.as_str()) {
                return Err(AppError::config_error(format!(
                    "Duplicate command name \"{}\" in test case \"{}\"",
                    command.name, self.name
                )));
            }
            command.validate()?;
        }
        Ok(())
    }
}

/// One command of a multi-command test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub name: String,
    pub cmd: String,

    #[serde(default, skip_serializing_if = "is_default")]
    pub input: StdinSettings,
    #[serde(default, skip_serializing_if = "is_default")]
    pub return_code: ReturnCodeCheckWithDeduction,
    #[serde(default, skip_serializing_if = "is_default")]
    pub stdout: OutputCheckWithDeduction,
    #[serde(default, skip_serializing_if = "is_default")]
    pub stderr: OutputCheckWithDeduction,
    #[serde(default, skip_serializing_if = "is_default")]
    pub diff_options: DiffOptions,
    #[serde(default, skip_serializing_if = "is_default")]
    pub feedback: CommandFeedbackSettings,
    #[serde(default, skip_serializing_if = "is_default")]
    pub resources: ResourceLimits,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repeat: Vec<Substitution>,
}

impl CommandConfig {
    pub fn new(name: &str, cmd: &str) -> Self {
        Self {
            name: name.to_string(),
            cmd: cmd.to_string(),
            input: StdinSettings::default(),
            return_code: ReturnCodeCheckWithDeduction::default(),
            stdout: OutputCheckWithDeduction::default(),
            stderr: OutputCheckWithDeduction::default(),
            diff_options: DiffOptions::default(),
            feedback: CommandFeedbackSettings::default(),
            resources: ResourceLimits::default(),
            repeat: Vec::new(),
        }
    }

    fn substitute(&mut self, substitution: &Substitution) -> Result<(), AppError> {
        self.name = repeat::apply_substitutions(&self.name, substitution)?;
        self.cmd = repeat::apply_substitutions(&self.cmd, substitution)?;
        self.input.instructor_file =
            repeat::apply_to_optional(&self.input.instructor_file, substitution)?;
        self.stdout.instructor_file =
            repeat::apply_to_optional(&self.stdout.instructor_file, substitution)?;
        self.stderr.instructor_file =
            repeat::apply_to_optional(&self.stderr.instructor_file, substitution)?;
        Ok(())
    }

    pub fn do_repeat(&self) -> Result<Vec<CommandConfig>, AppError> {
        if self.repeat.is_empty() {
            return Ok(vec![self.clone()]);
        }

        self.repeat
            .iter()
            .map(|substitution| {
                let mut instance = self.clone();
                instance.repeat.clear();
                instance.substitute(substitution)?;
                repeat::apply_overrides(instance, substitution, COMMAND_FIELDS, &self.name)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_command_settings(
            &self.name,
            &self.input,
            [self.stdout.as_source(), self.stderr.as_source()],
        )
    }
}

fn validate_command_settings(
    owner: &str,
    input: &StdinSettings,
    outputs: [(ExpectedOutputSource, Option<&str>); 2],
) -> Result<(), AppError> {
    if input.source == StdinSource::InstructorFile && input.instructor_file.is_none() {
        return Err(AppError::config_error(format!(
            "\"{}\": input source instructor_file requires input.instructor_file",
            owner
        )));
    }
    for (stream, (source, file)) in ["stdout", "stderr"].iter().zip(outputs) {
        if source == ExpectedOutputSource::InstructorFile && file.is_none() {
            return Err(AppError::config_error(format!(
                "\"{}\": {} compare_with instructor_file requires {}.instructor_file",
                owner, stream, stream
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdinSource {
    #[default]
    None,
    Text,
    InstructorFile,
    SetupStdout,
    SetupStderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedReturnCode {
    #[default]
    None,
    Zero,
    Nonzero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutputSource {
    #[default]
    None,
    Text,
    InstructorFile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StdinSettings {
    #[serde(default, skip_serializing_if = "is_default")]
    pub source: StdinSource,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReturnCodeCheck {
    #[serde(default, skip_serializing_if = "is_default")]
    pub expected: ExpectedReturnCode,
    #[serde(default, skip_serializing_if = "is_default")]
    pub points: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReturnCodeCheckWithDeduction {
    #[serde(default, skip_serializing_if = "is_default")]
    pub expected: ExpectedReturnCode,
    #[serde(default, skip_serializing_if = "is_default")]
    pub points: i32,
    #[serde(default, skip_serializing_if = "is_default")]
    pub deduction: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputCheck {
    #[serde(default, skip_serializing_if = "is_default")]
    pub compare_with: ExpectedOutputSource,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_file: Option<String>,
    #[serde(default, skip_serializing_if = "is_default")]
    pub points: i32,
}

impl OutputCheck {
    fn as_source(&self) -> (ExpectedOutputSource, Option<&str>) {
        (self.compare_with, self.instructor_file.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputCheckWithDeduction {
    #[serde(default, skip_serializing_if = "is_default")]
    pub compare_with: ExpectedOutputSource,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_file: Option<String>,
    #[serde(default, skip_serializing_if = "is_default")]
    pub points: i32,
    #[serde(default, skip_serializing_if = "is_default")]
    pub deduction: i32,
}

impl OutputCheckWithDeduction {
    fn as_source(&self) -> (ExpectedOutputSource, Option<&str>) {
        (self.compare_with, self.instructor_file.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiffOptions {
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_case: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_whitespace: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_whitespace_changes: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_blank_lines: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceLimits {
    /// Seconds.
    #[serde(default = "default_time_limit", skip_serializing_if = "is_default_time_limit")]
    pub time_limit: u32,
    /// Bytes; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_memory_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub block_process_spawn: bool,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self { time_limit: default_time_limit(), virtual_memory_limit: None, block_process_spawn: false }
    }
}

fn default_time_limit() -> u32 {
    10
}

fn is_default_time_limit(value: &u32) -> bool {
    *value == default_time_limit()
}

/// Command feedback for each of the service's viewing contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandFeedbackSettings {
    #[serde(default = "pass_fail", skip_serializing_if = "is_pass_fail")]
    pub normal_fdbk_config: FeedbackSetting<CommandFeedbackConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_failed_test_normal_fdbk_config: Option<FeedbackSetting<CommandFeedbackConfig>>,
    #[serde(default = "pass_fail", skip_serializing_if = "is_pass_fail")]
    pub ultimate_submission_fdbk_config: FeedbackSetting<CommandFeedbackConfig>,
    #[serde(default = "private", skip_serializing_if = "is_private")]
    pub past_limit_submission_fdbk_config: FeedbackSetting<CommandFeedbackConfig>,
    #[serde(default = "public", skip_serializing_if = "is_public")]
    pub staff_viewer_fdbk_config: FeedbackSetting<CommandFeedbackConfig>,
}

impl Default for CommandFeedbackSettings {
    fn default() -> Self {
        Self {
            normal_fdbk_config: pass_fail(),
            first_failed_test_normal_fdbk_config: None,
            ultimate_submission_fdbk_config: pass_fail(),
            past_limit_submission_fdbk_config: private(),
            staff_viewer_fdbk_config: public(),
        }
    }
}

impl CommandFeedbackSettings {
    /// Every setting, for reference checks.
    pub fn settings(&self) -> impl Iterator<Item = &FeedbackSetting<CommandFeedbackConfig>> {
        [
            Some(&self.normal_fdbk_config),
            self.first_failed_test_normal_fdbk_config.as_ref(),
            Some(&self.ultimate_submission_fdbk_config),
            Some(&self.past_limit_submission_fdbk_config),
            Some(&self.staff_viewer_fdbk_config),
        ]
        .into_iter()
        .flatten()
    }
}

fn pass_fail() -> FeedbackSetting<CommandFeedbackConfig> {
    FeedbackSetting::preset(PASS_FAIL)
}

fn private() -> FeedbackSetting<CommandFeedbackConfig> {
    FeedbackSetting::preset(PRIVATE)
}

fn public() -> FeedbackSetting<CommandFeedbackConfig> {
    FeedbackSetting::preset(PUBLIC)
}

fn is_pass_fail(value: &FeedbackSetting<CommandFeedbackConfig>) -> bool {
    value.is_preset(PASS_FAIL)
}

fn is_private(value: &FeedbackSetting<CommandFeedbackConfig>) -> bool {
    value.is_preset(PRIVATE)
}

fn is_public(value: &FeedbackSetting<CommandFeedbackConfig>) -> bool {
    value.is_preset(PUBLIC)
}

/// Test-case feedback for multi-command test cases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCaseFeedbackSettings {
    #[serde(default, skip_serializing_if = "is_default")]
    pub normal_fdbk_config: TestCaseFeedbackConfig,
    #[serde(default, skip_serializing_if = "is_default")]
    pub ultimate_submission_fdbk_config: TestCaseFeedbackConfig,
    #[serde(default, skip_serializing_if = "is_default")]
    pub past_limit_submission_fdbk_config: TestCaseFeedbackConfig,
    #[serde(default, skip_serializing_if = "is_default")]
    pub staff_viewer_fdbk_config: TestCaseFeedbackConfig,
}
