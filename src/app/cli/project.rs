//! Project subcommand implementations.

use std::path::Path;

use crate::app::api::{self, InitOptions, LoadOptions, ProjectCopyOptions};
use crate::domain::{ApiConfig, AppError, CourseSelection, CutoffPreference, Semester};

pub fn run_init(
    course_name: &str,
    semester: Semester,
    year: i32,
    project_name: &str,
    config_file: &Path,
    timezone: &str,
    force: bool,
) -> Result<(), AppError> {
    let outcome = api::init(&InitOptions {
        course_name,
        semester,
        year,
        project_name,
        config_file,
        timezone,
        force,
    })?;
    println!("✅ Wrote {}", outcome.config_path.display());
    if let Some(path) = outcome.instructor_file {
        println!("✅ Wrote placeholder instructor file {}", path.display());
    }
    Ok(())
}

pub fn run_load(
    api_config: &ApiConfig,
    course_name: &str,
    semester: Semester,
    year: i32,
    project_name: &str,
    output_file: &Path,
    cutoff: CutoffPreference,
) -> Result<(), AppError> {
    let course =
        CourseSelection { name: course_name.to_string(), semester: Some(semester), year: Some(year) };
    let outcome = api::load(api_config, &LoadOptions { course, project_name, output_file, cutoff })?;
    println!(
        "✅ Loaded \"{}\" into {} ({} test suite(s), {} instructor file(s))",
        project_name,
        outcome.config_path.display(),
        outcome.test_suites,
        outcome.instructor_files.len()
    );
    Ok(())
}

pub fn run_save(api_config: &ApiConfig, config_file: &Path) -> Result<(), AppError> {
    let outcome = api::save(api_config, config_file)?;
    if outcome.project_created {
        println!("✅ Created project from {}", config_file.display());
    }
    println!(
        "✅ Saved {} ({} created, {} updated, {} warning(s))",
        config_file.display(),
        outcome.created,
        outcome.updated,
        outcome.warnings.len()
    );
    Ok(())
}

pub fn run_copy(api_config: &ApiConfig, options: &ProjectCopyOptions<'_>) -> Result<(), AppError> {
    let copy = api::copy_project(api_config, options)?;
    println!(
        "✅ Copied \"{}\" to \"{}\" on {} (pk {})",
        options.project_name, copy.name, options.target_course, copy.pk
    );
    Ok(())
}
