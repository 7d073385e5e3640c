//! Project deadline variants and their mapping to the service's closing-time pair.

use chrono::{NaiveDateTime, TimeDelta};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::domain::AppError;
use crate::domain::time::{self, serde_format};

/// A submission deadline and, optionally, a later hard cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "dto::DeadlineDto", into = "dto::DeadlineDto")]
pub enum Deadline {
    /// Hard cutoff expressed as an offset from the deadline.
    Relative { deadline: NaiveDateTime, cutoff: TimeDelta },
    /// Hard cutoff expressed as its own timestamp.
    Fixed { deadline: NaiveDateTime, cutoff: NaiveDateTime },
    NoCutoff { deadline: NaiveDateTime },
}

/// Which form the loader uses when the service has both a soft and a hard closing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutoffPreference {
    Relative,
    #[default]
    Fixed,
}

impl std::str::FromStr for CutoffPreference {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "relative" => Ok(CutoffPreference::Relative),
            "fixed" => Ok(CutoffPreference::Fixed),
            other => Err(AppError::config_error(format!(
                "Unknown cutoff type '{}'. Expected 'relative' or 'fixed'",
                other
            ))),
        }
    }
}

impl Deadline {
    pub fn relative(deadline: NaiveDateTime, cutoff: TimeDelta) -> Result<Self, AppError> {
        let value = Deadline::Relative { deadline, cutoff };
        value.validate()?;
        Ok(value)
    }

    pub fn fixed(deadline: NaiveDateTime, cutoff: NaiveDateTime) -> Result<Self, AppError> {
        let value = Deadline::Fixed { deadline, cutoff };
        value.validate()?;
        Ok(value)
    }

    pub fn deadline(&self) -> NaiveDateTime {
        match self {
            Deadline::Relative { deadline, .. }
            | Deadline::Fixed { deadline, .. }
            | Deadline::NoCutoff { deadline } => *deadline,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            Deadline::Relative { cutoff, .. } if *cutoff < TimeDelta::zero() => {
                Err(AppError::config_error("A relative cutoff must not be negative."))
            }
            Deadline::Fixed { deadline, cutoff } if cutoff < deadline => {
                Err(AppError::config_error("A fixed cutoff must be >= the deadline."))
            }
            _ => Ok(()),
        }
    }

    /// Wall-clock hard cutoff, if there is one.
    pub fn hard_cutoff(&self) -> Result<Option<NaiveDateTime>, AppError> {
        match self {
            Deadline::Relative { deadline, cutoff } => deadline
                .checked_add_signed(*cutoff)
                .map(Some)
                .ok_or_else(|| AppError::config_error("Deadline cutoff is out of range")),
            Deadline::Fixed { cutoff, .. } => Ok(Some(*cutoff)),
            Deadline::NoCutoff { .. } => Ok(None),
        }
    }
}

/// Remote closing times as RFC 3339 strings: `(soft_closing_time, closing_time)`.
pub fn to_remote_window(
    deadline: Option<&Deadline>,
    timezone: &Tz,
) -> Result<(Option<String>, Option<String>), AppError> {
    let Some(deadline) = deadline else {
        return Ok((None, None));
    };

    let soft = time::to_remote_timestamp(&deadline.deadline(), timezone)?;
    let hard = match deadline.hard_cutoff()? {
        Some(cutoff) => Some(time::to_remote_timestamp(&cutoff, timezone)?),
        None => None,
    };
    Ok((Some(soft), hard))
}

/// Rebuild a deadline from the service's closing times.
pub fn from_remote_window(
    soft_closing_time: Option<&str>,
    closing_time: Option<&str>,
    timezone: &Tz,
    preference: CutoffPreference,
) -> Result<Option<Deadline>, AppError> {
    let soft = soft_closing_time.map(|value| time::from_remote_timestamp(value, timezone));
    let hard = closing_time.map(|value| time::from_remote_timestamp(value, timezone));

    match (soft.transpose()?, hard.transpose()?) {
        (Some(soft), Some(hard)) => match preference {
            CutoffPreference::Relative if time::is_whole_minutes(hard - soft) => {
                Deadline::relative(soft, hard - soft).map(Some)
            }
            CutoffPreference::Relative if hard >= soft => {
                tracing::warn!(
                    "The hard cutoff is not a whole number of minutes after the deadline. \
                     Writing it as a fixed cutoff."
                );
                Deadline::fixed(soft, hard).map(Some)
            }
            CutoffPreference::Relative => Deadline::relative(soft, hard - soft).map(Some),
            CutoffPreference::Fixed => Deadline::fixed(soft, hard).map(Some),
        },
        (Some(soft), None) => Ok(Some(Deadline::NoCutoff { deadline: soft })),
        (None, Some(hard)) => Deadline::relative(hard, TimeDelta::zero()).map(Some),
        (None, None) => Ok(None),
    }
}

mod dto {
    use super::*;

    fn is_zero(value: &TimeDelta) -> bool {
        *value == TimeDelta::zero()
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "cutoff_type", rename_all = "snake_case", deny_unknown_fields)]
    pub(super) enum DeadlineDto {
        Relative {
            #[serde(with = "serde_format::datetime")]
            deadline: NaiveDateTime,
            #[serde(default, with = "serde_format::duration", skip_serializing_if = "is_zero")]
            cutoff: TimeDelta,
        },
        Fixed {
            #[serde(with = "serde_format::datetime")]
            deadline: NaiveDateTime,
            #[serde(with = "serde_format::datetime")]
            cutoff: NaiveDateTime,
        },
        None {
            #[serde(with = "serde_format::datetime")]
            deadline: NaiveDateTime,
        },
    }

    impl TryFrom<DeadlineDto> for Deadline {
        type Error = AppError;

        fn try_from(dto: DeadlineDto) -> Result<Self, Self::Error> {
            match dto {
                DeadlineDto::Relative { deadline, cutoff } => Deadline::relative(deadline, cutoff),
                DeadlineDto::Fixed { deadline, cutoff } => Deadline::fixed(deadline, cutoff),
                DeadlineDto::None { deadline } => Ok(Deadline::NoCutoff { deadline }),
            }
        }
    }

    impl From<Deadline> for DeadlineDto {
        fn from(value: Deadline) -> Self {
            match value {
                Deadline::Relative { deadline, cutoff } => DeadlineDto::Relative { deadline, cutoff },
                Deadline::Fixed { deadline, cutoff } => DeadlineDto::Fixed { deadline, cutoff },
                Deadline::NoCutoff { deadline } => DeadlineDto::None { deadline },
            }
        }
    }
}
