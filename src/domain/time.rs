//! Parsing and canonical formatting of human-entered dates, times, durations and timezones.
//!
//! Deadline values are wall-clock times in the project's timezone. They only become
//! absolute instants at the API boundary, via [`to_remote_timestamp`].

use std::sync::OnceLock;

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use regex::Regex;

use crate::domain::AppError;

const DATETIME_FORMAT: &str = "%b %d, %Y %I:%M%p";
const CLOCK_TIME_FORMAT: &str = "%I:%M%p";
const REMOTE_CLOCK_TIME_FORMAT: &str = "%H:%M:%S";

const DATETIME_INPUT_FORMATS: &[&str] = &[
    DATETIME_FORMAT,
    "%b %d, %Y %I:%M %p",
    "%b %d %Y %I:%M%p",
    "%b %d %Y %I:%M %p",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M%p",
    "%Y-%m-%d %I:%M %p",
    "%m/%d/%Y %I:%M%p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M",
];

const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d, %Y", "%b %d %Y", "%m/%d/%Y"];

const CLOCK_TIME_INPUT_FORMATS: &[&str] =
    &[CLOCK_TIME_FORMAT, "%I:%M %p", "%H:%M:%S%.f", "%H:%M"];

/// Parse an optional datetime string. `None` passes through unchanged.
pub fn parse_datetime_like(value: Option<&str>) -> Result<Option<NaiveDateTime>, AppError> {
    value.map(parse_datetime).transpose()
}

/// Parse a free-form datetime string into a wall-clock value.
///
/// Strings that carry a UTC offset keep the wall-clock time they were written with.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime, AppError> {
    let trimmed = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.naive_local());
    }
    if let Ok(parsed) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(parsed.naive_local());
    }

    for format in DATETIME_INPUT_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }

    for format in DATE_INPUT_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }

    Err(AppError::format_error(format!("Unrecognized datetime format: '{}'", value)))
}

/// Parse a time of day such as `12:00AM`, `9:30 pm` or `23:15:00`.
pub fn parse_clock_time(value: &str) -> Result<NaiveTime, AppError> {
    let trimmed = value.trim();

    for format in CLOCK_TIME_INPUT_FORMATS {
        if let Ok(parsed) = NaiveTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }

    parse_datetime(trimmed)
        .map(|parsed| parsed.time())
        .map_err(|_| AppError::format_error(format!("Unrecognized time format: '{}'", value)))
}

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:(\d+)\s*d)?\s*(?:(\d+)\s*h)?\s*(?:(\d+)\s*m)?\s*$")
            .expect("duration pattern is a valid regex")
    })
}

/// Parse a duration written as `XdXhXm`. Every component is optional; `""` is zero.
pub fn parse_duration(value: &str) -> Result<TimeDelta, AppError> {
    let error = || {
        AppError::format_error(format!(
            "Expected a duration in the format \"XdXhXm\", got '{}'",
            value
        ))
    };

    let captures = duration_pattern().captures(value).ok_or_else(error)?;
    let component = |index: usize| -> Result<i64, AppError> {
        match captures.get(index) {
            Some(matched) => matched.as_str().parse::<i64>().map_err(|_| error()),
            None => Ok(0),
        }
    };

    let days = TimeDelta::try_days(component(1)?).ok_or_else(error)?;
    let hours = TimeDelta::try_hours(component(2)?).ok_or_else(error)?;
    let minutes = TimeDelta::try_minutes(component(3)?).ok_or_else(error)?;

    days.checked_add(&hours).and_then(|sum| sum.checked_add(&minutes)).ok_or_else(error)
}

/// Whether `value` can be written as `XdXhXm` without loss.
pub fn is_whole_minutes(value: TimeDelta) -> bool {
    value >= TimeDelta::zero() && value.num_seconds() % 60 == 0 && value.subsec_nanos() == 0
}

/// Canonical `1d2h3m` form. Zero components are omitted.
///
/// Negative values and values with leftover seconds have no such form and are rejected.
pub fn serialize_duration(value: TimeDelta) -> Result<String, AppError> {
    if !is_whole_minutes(value) {
        return Err(AppError::format_error(format!(
            "Cannot write a duration of {} seconds as \"XdXhXm\"",
            value.num_seconds()
        )));
    }
    let days = value.num_days();
    let hours = value.num_hours() % 24;
    let minutes = value.num_minutes() % 60;

    let mut result = String::new();
    if days != 0 {
        result.push_str(&format!("{}d", days));
    }
    if hours != 0 {
        result.push_str(&format!("{}h", hours));
    }
    if minutes != 0 {
        result.push_str(&format!("{}m", minutes));
    }
    Ok(result)
}

pub fn serialize_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub fn serialize_clock_time(value: &NaiveTime) -> String {
    value.format(CLOCK_TIME_FORMAT).to_string()
}

/// Look a timezone up in the IANA database.
pub fn validate_timezone(name: &str) -> Result<Tz, AppError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| AppError::format_error(format!("Unrecognized timezone: '{}'", name)))
}

pub fn serialize_timezone(timezone: &Tz) -> String {
    timezone.name().to_string()
}

/// Pin a wall-clock value to an instant in `timezone`.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant.
pub fn localize(value: &NaiveDateTime, timezone: &Tz) -> Result<DateTime<Tz>, AppError> {
    match timezone.from_local_datetime(value) {
        LocalResult::Single(instant) => Ok(instant),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(AppError::format_error(format!(
            "'{}' does not exist in timezone {}",
            serialize_datetime(value),
            timezone.name()
        ))),
    }
}

pub fn to_remote_timestamp(value: &NaiveDateTime, timezone: &Tz) -> Result<String, AppError> {
    Ok(localize(value, timezone)?.to_rfc3339())
}

/// Convert an RFC 3339 timestamp from the API into a wall-clock value in `timezone`.
pub fn from_remote_timestamp(value: &str, timezone: &Tz) -> Result<NaiveDateTime, AppError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|instant| instant.with_timezone(timezone).naive_local())
        .map_err(|err| {
            AppError::format_error(format!("Invalid timestamp '{}' from API: {}", value, err))
        })
}

pub fn to_remote_clock_time(value: &NaiveTime) -> String {
    value.format(REMOTE_CLOCK_TIME_FORMAT).to_string()
}

/// Serde adapters for the canonical string forms above.
pub mod serde_format {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    use crate::domain::AppError;

    fn parse_via_string<'de, D, T, F>(deserializer: D, parser: F) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        F: FnOnce(&str) -> Result<T, AppError>,
    {
        let raw = String::deserialize(deserializer)?;
        parser(&raw).map_err(D::Error::custom)
    }

    pub mod datetime {
        use chrono::NaiveDateTime;
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &NaiveDateTime,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&super::super::serialize_datetime(value))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<NaiveDateTime, D::Error> {
            super::parse_via_string(deserializer, super::super::parse_datetime)
        }
    }

    pub mod duration {
        use chrono::TimeDelta;
        use serde::ser::Error as _;
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
            let text = super::super::serialize_duration(*value).map_err(S::Error::custom)?;
            serializer.serialize_str(&text)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<TimeDelta, D::Error> {
            super::parse_via_string(deserializer, super::super::parse_duration)
        }
    }

    pub mod clock_time {
        use chrono::NaiveTime;
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&super::super::serialize_clock_time(value))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<NaiveTime, D::Error> {
            super::parse_via_string(deserializer, super::super::parse_clock_time)
        }
    }

    pub mod timezone {
        use chrono_tz::Tz;
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Tz, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(value.name())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tz, D::Error> {
            super::parse_via_string(deserializer, super::super::validate_timezone)
        }
    }
}
