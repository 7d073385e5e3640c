//! Project-wide grading policy.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::deadline::Deadline;
use super::{default_true, is_default, is_false, is_true};
use crate::domain::AppError;
use crate::domain::time::serde_format;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSettings {
    #[serde(
        rename = "anyone_with_link_can_submit",
        alias = "guests_can_submit",
        default,
        skip_serializing_if = "is_false"
    )]
    pub guests_can_submit: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Deadline>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_late_days: bool,

    #[serde(
        rename = "final_graded_submission_policy",
        alias = "ultimate_submission_policy",
        default,
        skip_serializing_if = "is_default"
    )]
    pub ultimate_submission_policy: UltimateSubmissionPolicy,

    #[serde(default = "default_group_size", skip_serializing_if = "is_default_group_size")]
    pub min_group_size: u32,
    #[serde(default = "default_group_size", skip_serializing_if = "is_default_group_size")]
    pub max_group_size: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_limit_per_day: Option<u32>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub allow_submissions_past_limit: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub groups_combine_daily_submissions: bool,
    #[serde(
        default = "default_reset_time",
        with = "serde_format::clock_time",
        skip_serializing_if = "is_default_reset_time"
    )]
    pub submission_limit_reset_time: NaiveTime,
    #[serde(default, skip_serializing_if = "is_default")]
    pub num_bonus_submissions: u32,

    #[serde(default, skip_serializing_if = "is_default")]
    pub send_email_receipts: EmailReceipts,

    /// Pledge text; `None` disables the honor pledge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honor_pledge: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_submission_limit: Option<u32>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            guests_can_submit: false,
            deadline: None,
            allow_late_days: false,
            ultimate_submission_policy: UltimateSubmissionPolicy::default(),
            min_group_size: default_group_size(),
            max_group_size: default_group_size(),
            submission_limit_per_day: None,
            allow_submissions_past_limit: true,
            groups_combine_daily_submissions: false,
            submission_limit_reset_time: default_reset_time(),
            num_bonus_submissions: 0,
            send_email_receipts: EmailReceipts::default(),
            honor_pledge: None,
            total_submission_limit: None,
        }
    }
}

impl ProjectSettings {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.min_group_size < 1 {
            return Err(AppError::config_error("min_group_size must be at least 1"));
        }
        if self.min_group_size > self.max_group_size {
            return Err(AppError::config_error(format!(
                "min_group_size ({}) must not exceed max_group_size ({})",
                self.min_group_size, self.max_group_size
            )));
        }
        if let Some(deadline) = &self.deadline {
            deadline.validate()?;
        }
        Ok(())
    }
}

fn default_group_size() -> u32 {
    1
}

fn is_default_group_size(value: &u32) -> bool {
    *value == default_group_size()
}

fn default_reset_time() -> NaiveTime {
    NaiveTime::MIN
}

fn is_default_reset_time(value: &NaiveTime) -> bool {
    *value == default_reset_time()
}

/// Which submission counts toward the final grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UltimateSubmissionPolicy {
    #[default]
    MostRecent,
    Best,
}

impl UltimateSubmissionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UltimateSubmissionPolicy::MostRecent => "most_recent",
            UltimateSubmissionPolicy::Best => "best",
        }
    }
}

/// Collapsed form of the two email-receipt switches.
///
/// Written as `false`, `true`, `"on_received"` or `"on_finish"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailReceipts {
    #[default]
    Never,
    OnReceived,
    OnFinish,
    Always,
}

impl EmailReceipts {
    pub fn from_flags(on_received: bool, on_finish: bool) -> Self {
        match (on_received, on_finish) {
            (true, true) => EmailReceipts::Always,
            (true, false) => EmailReceipts::OnReceived,
            (false, true) => EmailReceipts::OnFinish,
            (false, false) => EmailReceipts::Never,
        }
    }

    pub fn on_submission_received(self) -> bool {
        matches!(self, EmailReceipts::Always | EmailReceipts::OnReceived)
    }

    pub fn on_tests_finished(self) -> bool {
        matches!(self, EmailReceipts::Always | EmailReceipts::OnFinish)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum EmailReceiptsRepr {
    Flag(bool),
    Mode(String),
}

impl Serialize for EmailReceipts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            EmailReceipts::Never => EmailReceiptsRepr::Flag(false),
            EmailReceipts::Always => EmailReceiptsRepr::Flag(true),
            EmailReceipts::OnReceived => EmailReceiptsRepr::Mode("on_received".to_string()),
            EmailReceipts::OnFinish => EmailReceiptsRepr::Mode("on_finish".to_string()),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EmailReceipts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match EmailReceiptsRepr::deserialize(deserializer)? {
            EmailReceiptsRepr::Flag(true) => Ok(EmailReceipts::Always),
            EmailReceiptsRepr::Flag(false) => Ok(EmailReceipts::Never),
            EmailReceiptsRepr::Mode(mode) => match mode.as_str() {
                "on_received" => Ok(EmailReceipts::OnReceived),
                "on_finish" => Ok(EmailReceipts::OnFinish),
                other => Err(serde::de::Error::custom(format!(
                    "send_email_receipts must be true, false, \"on_received\" or \"on_finish\", got \"{}\"",
                    other
                ))),
            },
        }
    }
}
