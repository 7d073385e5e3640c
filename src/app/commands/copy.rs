//! Server-side copies of projects and courses.

use super::lookup::{find_course, resolve_project};
use crate::app::AppContext;
use crate::domain::{AppError, CourseSelection, Semester};
use crate::ports::AutograderApi;
use crate::ports::resources::{Course, CourseCopyBody, Project};

#[derive(Debug, Clone)]
pub struct ProjectCopyOptions<'a> {
    pub course: CourseSelection,
    pub project_name: &'a str,
    pub target_course: CourseSelection,
    /// Keeps the source name when unset.
    pub new_name: Option<&'a str>,
}

/// Copy a project, with its files and test suites, into another course.
///
/// The target course must not already hold a project with the resulting name.
pub fn copy_project<A: AutograderApi>(
    ctx: &AppContext<A>,
    options: &ProjectCopyOptions<'_>,
) -> Result<Project, AppError> {
    let api = ctx.api();
    let (_, source) = resolve_project(api, &options.course, options.project_name, true)?;
    let source = source.ok_or_else(|| {
        AppError::NotFound(format!("Project \"{}\" not found", options.project_name))
    })?;

    let name = options.new_name.unwrap_or(options.project_name);
    let (target, existing) = resolve_project(api, &options.target_course, name, false)?;
    if existing.is_some() {
        return Err(AppError::config_error(format!(
            "Course \"{}\" already has a project named \"{}\"",
            options.target_course, name
        )));
    }

    let copy = api.copy_project(source.pk, target.pk, options.new_name)?;
    tracing::info!(pk = copy.pk, name = %copy.name, course = target.pk, "copied project");
    Ok(copy)
}

/// Copy a course and all of its projects under new coordinates.
pub fn copy_course<A: AutograderApi>(
    ctx: &AppContext<A>,
    course: &CourseSelection,
    new_name: &str,
    new_semester: Semester,
    new_year: i32,
) -> Result<Course, AppError> {
    let api = ctx.api();
    let source = find_course(api, course)?;
    let body = CourseCopyBody {
        new_name: new_name.to_string(),
        new_semester: new_semester.as_str().to_string(),
        new_year,
    };
    let copy = api.copy_course(source.pk, &body)?;
    tracing::info!(pk = copy.pk, name = %copy.name, "copied course");
    Ok(copy)
}
