use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};

use super::files::{ExpectedStudentFile, InstructorFileConfig};
use super::is_default;
use super::settings::ProjectSettings;
use super::test_suite::TestSuiteConfig;
use crate::domain::AppError;
use crate::domain::time::serde_format;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Semester {
    Fall,
    Winter,
    Spring,
    Summer,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::Fall => "Fall",
            Semester::Winter => "Winter",
            Semester::Spring => "Spring",
            Semester::Summer => "Summer",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Semester {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Fall" => Ok(Semester::Fall),
            "Winter" => Ok(Semester::Winter),
            "Spring" => Ok(Semester::Spring),
            "Summer" => Ok(Semester::Summer),
            other => Err(AppError::config_error(format!(
                "Unknown semester '{}'. Expected Fall, Winter, Spring or Summer",
                other
            ))),
        }
    }
}

/// Identifies a course on the grading service. Lookup key only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourseSelection {
    pub name: String,
    #[serde(default)]
    pub semester: Option<Semester>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl fmt::Display for CourseSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(semester) = self.semester {
            write!(f, " {}", semester)?;
        }
        if let Some(year) = self.year {
            write!(f, " {}", year)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,
    /// IANA zone that deadlines and the daily reset time are written in.
    #[serde(with = "serde_format::timezone")]
    pub timezone: Tz,
    pub course: CourseSelection,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_default")]
    pub settings: ProjectSettings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub student_files: Vec<ExpectedStudentFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructor_files: Vec<InstructorFileConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_suites: Vec<TestSuiteConfig>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
