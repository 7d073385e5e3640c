//! Student submission expectations and instructor-provided files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, Serializer};

use crate::domain::AppError;

/// A file students are expected to submit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "dto::StudentFileDto")]
pub enum ExpectedStudentFile {
    ExactMatch { filename: String },
    FnmatchPattern { pattern: String, min_num_matches: u32, max_num_matches: u32 },
}

impl ExpectedStudentFile {
    pub fn exact(filename: &str) -> Self {
        ExpectedStudentFile::ExactMatch { filename: filename.to_string() }
    }

    /// The remote lookup key.
    pub fn pattern(&self) -> &str {
        match self {
            ExpectedStudentFile::ExactMatch { filename } => filename,
            ExpectedStudentFile::FnmatchPattern { pattern, .. } => pattern,
        }
    }

    pub fn match_bounds(&self) -> (u32, u32) {
        match self {
            ExpectedStudentFile::ExactMatch { .. } => (1, 1),
            ExpectedStudentFile::FnmatchPattern { min_num_matches, max_num_matches, .. } => {
                (*min_num_matches, *max_num_matches)
            }
        }
    }

    /// Exactly one match of a pattern is the same thing as an exact filename.
    pub fn from_remote(pattern: &str, min_num_matches: u32, max_num_matches: u32) -> Self {
        if min_num_matches == 1 && max_num_matches == 1 {
            ExpectedStudentFile::exact(pattern)
        } else {
            ExpectedStudentFile::FnmatchPattern {
                pattern: pattern.to_string(),
                min_num_matches,
                max_num_matches,
            }
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.pattern().trim().is_empty() {
            return Err(AppError::config_error("Student file patterns must not be empty"));
        }
        let (min, max) = self.match_bounds();
        if min > max {
            return Err(AppError::config_error(format!(
                "Student file \"{}\": min_num_matches ({}) must not exceed max_num_matches ({})",
                self.pattern(),
                min,
                max
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ExpectedStudentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

impl Serialize for ExpectedStudentFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExpectedStudentFile::ExactMatch { filename } => {
                dto::ExactMatchDto { filename: filename.clone() }.serialize(serializer)
            }
            ExpectedStudentFile::FnmatchPattern { pattern, min_num_matches, max_num_matches } => {
                dto::FnmatchDto {
                    pattern: pattern.clone(),
                    min_num_matches: *min_num_matches,
                    max_num_matches: *max_num_matches,
                }
                .serialize(serializer)
            }
        }
    }
}

mod dto {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub(super) struct ExactMatchDto {
        pub filename: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub(super) struct FnmatchDto {
        pub pattern: String,
        pub min_num_matches: u32,
        pub max_num_matches: u32,
    }

    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    pub(super) enum StudentFileDto {
        Bare(String),
        Mapping(serde_yaml::Mapping),
    }

    impl TryFrom<StudentFileDto> for ExpectedStudentFile {
        type Error = AppError;

        fn try_from(dto: StudentFileDto) -> Result<Self, Self::Error> {
            let mapping = match dto {
                StudentFileDto::Bare(filename) => return Ok(ExpectedStudentFile::ExactMatch { filename }),
                StudentFileDto::Mapping(mapping) => mapping,
            };

            let has_filename = mapping.contains_key("filename");
            let has_pattern = mapping.contains_key("pattern");
            let value = serde_yaml::Value::Mapping(mapping);
            let invalid = |err: serde_yaml::Error| {
                AppError::config_error(format!("Invalid student file entry: {}", err))
            };

            let file = match (has_filename, has_pattern) {
                (true, false) => {
                    let exact: ExactMatchDto = serde_yaml::from_value(value).map_err(invalid)?;
                    ExpectedStudentFile::ExactMatch { filename: exact.filename }
                }
                (false, true) => {
                    let pattern: FnmatchDto = serde_yaml::from_value(value).map_err(invalid)?;
                    ExpectedStudentFile::FnmatchPattern {
                        pattern: pattern.pattern,
                        min_num_matches: pattern.min_num_matches,
                        max_num_matches: pattern.max_num_matches,
                    }
                }
                (true, true) => {
                    return Err(AppError::config_error(
                        "Student file entries need exactly one of \"filename\" or \"pattern\", found both",
                    ));
                }
                (false, false) => {
                    return Err(AppError::config_error(
                        "Student file entries need exactly one of \"filename\" or \"pattern\"",
                    ));
                }
            };
            file.validate()?;
            Ok(file)
        }
    }
}

/// A file the instructor uploads. The remote name is the last path component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstructorFileConfig {
    /// Relative to the config file's directory.
    pub local_path: PathBuf,
}

impl InstructorFileConfig {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self { local_path: local_path.into() }
    }

    pub fn name(&self) -> String {
        self.local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.local_path.to_string_lossy().into_owned())
    }

    pub fn resolve(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.local_path)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.local_path.file_name().is_none() {
            return Err(AppError::config_error(format!(
                "Instructor file path '{}' does not name a file",
                self.local_path.display()
            )));
        }
        Ok(())
    }
}
