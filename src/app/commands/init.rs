use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::embedded_init_template::{
    INSTRUCTOR_FILE_NAME, InitTemplateValues, instructor_file_placeholder, render_init_config,
};
use crate::domain::time;
use crate::domain::{AgConfig, AppError, Semester};

#[derive(Debug, Clone)]
pub struct InitOptions<'a> {
    pub course_name: &'a str,
    pub semester: Semester,
    pub year: i32,
    pub project_name: &'a str,
    pub config_file: &'a Path,
    pub timezone: &'a str,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    pub config_path: PathBuf,
    /// Set when the placeholder instructor file was written.
    pub instructor_file: Option<PathBuf>,
}

/// Execute the init command.
///
/// Writes a starter config and, when absent, the instructor file it references.
pub fn execute(options: &InitOptions<'_>) -> Result<InitOutcome, AppError> {
    let timezone = time::validate_timezone(options.timezone)?;
    if options.config_file.exists() && !options.force {
        return Err(AppError::config_error(format!(
            "{} already exists. Use --force to overwrite it.",
            options.config_file.display()
        )));
    }

    let rendered = render_init_config(&InitTemplateValues {
        project_name: options.project_name,
        course_name: options.course_name,
        semester: options.semester,
        year: options.year,
        timezone: timezone.name(),
    })?;
    AgConfig::parse_str(&rendered)?.validate()?;

    let config_dir = match options.config_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&config_dir)?;
    fs::write(options.config_file, rendered)?;

    let instructor_path = config_dir.join(INSTRUCTOR_FILE_NAME);
    let instructor_file = if instructor_path.exists() {
        None
    } else {
        fs::write(&instructor_path, instructor_file_placeholder()?)?;
        Some(instructor_path)
    };

    Ok(InitOutcome { config_path: options.config_file.to_path_buf(), instructor_file })
}
