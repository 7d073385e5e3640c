//! Feedback configurations and the named presets that stand in for them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::AppError;

/// How much of an expected/actual value a student gets to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFeedbackLevel {
    NoFeedback,
    CorrectOrIncorrect,
    ExpectedAndActual,
}

/// Command-level feedback, as stored by the grading service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFeedbackConfig {
    pub visible: bool,
    pub show_student_description: bool,
    pub return_code_fdbk_level: ValueFeedbackLevel,
    pub stdout_fdbk_level: ValueFeedbackLevel,
    pub stderr_fdbk_level: ValueFeedbackLevel,
    pub show_points: bool,
    pub show_actual_return_code: bool,
    pub show_actual_stdout: bool,
    pub show_actual_stderr: bool,
    pub show_whether_timed_out: bool,
}

/// Test-suite setup feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteFeedbackConfig {
    pub visible: bool,
    pub show_individual_tests: bool,
    pub show_student_description: bool,
    pub show_setup_return_code: bool,
    pub show_setup_timed_out: bool,
    pub show_setup_stdout: bool,
    pub show_setup_stderr: bool,
}

/// Test-case feedback for multi-command test cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseFeedbackConfig {
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub show_individual_commands: bool,
    #[serde(default = "default_true")]
    pub show_student_description: bool,
}

impl Default for TestCaseFeedbackConfig {
    fn default() -> Self {
        Self { visible: true, show_individual_commands: true, show_student_description: true }
    }
}

fn default_true() -> bool {
    true
}

/// Either the name of a preset or an inline feedback object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackSetting<T> {
    Preset(String),
    Inline(T),
}

impl<T> FeedbackSetting<T> {
    pub fn preset(name: &str) -> Self {
        FeedbackSetting::Preset(name.to_string())
    }

    pub fn is_preset(&self, name: &str) -> bool {
        matches!(self, FeedbackSetting::Preset(preset) if preset == name)
    }
}

pub const PUBLIC: &str = "public";
pub const PASS_FAIL: &str = "pass/fail";
pub const PRIVATE: &str = "private";

const COMMAND_PASS_FAIL: CommandFeedbackConfig = CommandFeedbackConfig {
    visible: true,
    show_student_description: true,
    return_code_fdbk_level: ValueFeedbackLevel::CorrectOrIncorrect,
    stdout_fdbk_level: ValueFeedbackLevel::CorrectOrIncorrect,
    stderr_fdbk_level: ValueFeedbackLevel::CorrectOrIncorrect,
    show_points: true,
    show_actual_return_code: false,
    show_actual_stdout: false,
    show_actual_stderr: false,
    show_whether_timed_out: false,
};

/// Builtin command presets, in lookup priority order.
pub const BUILTIN_COMMAND_PRESETS: &[(&str, CommandFeedbackConfig)] = &[
    (PASS_FAIL, COMMAND_PASS_FAIL),
    (
        "pass/fail+timeout",
        CommandFeedbackConfig { show_whether_timed_out: true, ..COMMAND_PASS_FAIL },
    ),
    (
        "pass/fail+exit_status",
        CommandFeedbackConfig {
            show_actual_return_code: true,
            show_whether_timed_out: true,
            ..COMMAND_PASS_FAIL
        },
    ),
    (
        "pass/fail+output",
        CommandFeedbackConfig {
            show_actual_stdout: true,
            show_actual_stderr: true,
            ..COMMAND_PASS_FAIL
        },
    ),
    (
        "pass/fail+diff",
        CommandFeedbackConfig {
            stdout_fdbk_level: ValueFeedbackLevel::ExpectedAndActual,
            stderr_fdbk_level: ValueFeedbackLevel::ExpectedAndActual,
            ..COMMAND_PASS_FAIL
        },
    ),
    (
        PRIVATE,
        CommandFeedbackConfig {
            visible: true,
            show_student_description: false,
            return_code_fdbk_level: ValueFeedbackLevel::NoFeedback,
            stdout_fdbk_level: ValueFeedbackLevel::NoFeedback,
            stderr_fdbk_level: ValueFeedbackLevel::NoFeedback,
            show_points: false,
            show_actual_return_code: false,
            show_actual_stdout: false,
            show_actual_stderr: false,
            show_whether_timed_out: false,
        },
    ),
    (
        PUBLIC,
        CommandFeedbackConfig {
            visible: true,
            show_student_description: true,
            return_code_fdbk_level: ValueFeedbackLevel::ExpectedAndActual,
            stdout_fdbk_level: ValueFeedbackLevel::ExpectedAndActual,
            stderr_fdbk_level: ValueFeedbackLevel::ExpectedAndActual,
            show_points: true,
            show_actual_return_code: true,
            show_actual_stdout: true,
            show_actual_stderr: true,
            show_whether_timed_out: true,
        },
    ),
];

const SUITE_PUBLIC: SuiteFeedbackConfig = SuiteFeedbackConfig {
    visible: true,
    show_individual_tests: true,
    show_student_description: true,
    show_setup_return_code: true,
    show_setup_timed_out: true,
    show_setup_stdout: true,
    show_setup_stderr: true,
};

/// Builtin suite setup presets, in lookup priority order.
pub const BUILTIN_SUITE_PRESETS: &[(&str, SuiteFeedbackConfig)] = &[
    (PUBLIC, SUITE_PUBLIC),
    (
        PASS_FAIL,
        SuiteFeedbackConfig { show_setup_stdout: false, show_setup_stderr: false, ..SUITE_PUBLIC },
    ),
    (
        PRIVATE,
        SuiteFeedbackConfig {
            visible: true,
            show_individual_tests: true,
            show_student_description: false,
            show_setup_return_code: false,
            show_setup_timed_out: false,
            show_setup_stdout: false,
            show_setup_stderr: false,
        },
    ),
];

/// Builtin presets merged with the config's own. Built once per run and read-only after.
#[derive(Debug, Clone)]
pub struct PresetTable {
    commands: BTreeMap<String, CommandFeedbackConfig>,
    suites: BTreeMap<String, SuiteFeedbackConfig>,
}

impl PresetTable {
    /// User entries that share a builtin name replace the builtin.
    pub fn new(
        command_presets: &BTreeMap<String, CommandFeedbackConfig>,
        suite_presets: &BTreeMap<String, SuiteFeedbackConfig>,
    ) -> Self {
        let mut commands: BTreeMap<String, CommandFeedbackConfig> = BUILTIN_COMMAND_PRESETS
            .iter()
            .map(|(name, config)| (name.to_string(), *config))
            .collect();
        commands.extend(command_presets.iter().map(|(name, config)| (name.clone(), *config)));

        let mut suites: BTreeMap<String, SuiteFeedbackConfig> = BUILTIN_SUITE_PRESETS
            .iter()
            .map(|(name, config)| (name.to_string(), *config))
            .collect();
        suites.extend(suite_presets.iter().map(|(name, config)| (name.clone(), *config)));

        Self { commands, suites }
    }

    pub fn builtin() -> Self {
        Self::new(&BTreeMap::new(), &BTreeMap::new())
    }

    pub fn command(
        &self,
        setting: &FeedbackSetting<CommandFeedbackConfig>,
    ) -> Result<CommandFeedbackConfig, AppError> {
        match setting {
            FeedbackSetting::Inline(config) => Ok(*config),
            FeedbackSetting::Preset(name) => self.commands.get(name).copied().ok_or_else(|| {
                AppError::config_error(format!("Feedback preset \"{}\" not found", name))
            }),
        }
    }

    pub fn suite(
        &self,
        setting: &FeedbackSetting<SuiteFeedbackConfig>,
    ) -> Result<SuiteFeedbackConfig, AppError> {
        match setting {
            FeedbackSetting::Inline(config) => Ok(*config),
            FeedbackSetting::Preset(name) => self.suites.get(name).copied().ok_or_else(|| {
                AppError::config_error(format!(
                    "Suite setup feedback preset \"{}\" not found",
                    name
                ))
            }),
        }
    }
}

/// Express a remote command feedback config as a builtin preset name when one matches.
pub fn command_setting_for(config: CommandFeedbackConfig) -> FeedbackSetting<CommandFeedbackConfig> {
    BUILTIN_COMMAND_PRESETS
        .iter()
        .find(|(_, preset)| *preset == config)
        .map(|(name, _)| FeedbackSetting::preset(name))
        .unwrap_or(FeedbackSetting::Inline(config))
}

/// Express a remote suite feedback config as a builtin preset name when one matches.
pub fn suite_setting_for(config: SuiteFeedbackConfig) -> FeedbackSetting<SuiteFeedbackConfig> {
    BUILTIN_SUITE_PRESETS
        .iter()
        .find(|(_, preset)| *preset == config)
        .map(|(name, _)| FeedbackSetting::preset(name))
        .unwrap_or(FeedbackSetting::Inline(config))
}
