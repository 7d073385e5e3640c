//! Course and project resolution by human-readable coordinates.

use crate::domain::{AppError, CourseSelection};
use crate::ports::AutograderApi;
use crate::ports::resources::{Course, Project};

/// Find the course, then the project named `project_name` within it.
///
/// A missing course is always an error; a missing project only when `required`.
pub fn resolve_project<A: AutograderApi>(
    api: &A,
    course: &CourseSelection,
    project_name: &str,
    required: bool,
) -> Result<(Course, Option<Project>), AppError> {
    let found = find_course(api, course)?;
    let project = api.list_projects(found.pk)?.into_iter().find(|p| p.name == project_name);

    if project.is_none() && required {
        return Err(AppError::NotFound(format!(
            "Project \"{}\" not found on course \"{}\"",
            project_name, course
        )));
    }
    Ok((found, project))
}

pub(crate) fn find_course<A: AutograderApi>(
    api: &A,
    course: &CourseSelection,
) -> Result<Course, AppError> {
    let not_found = || AppError::NotFound(format!("Course \"{}\" not found", course));

    if let (Some(semester), Some(year)) = (course.semester, course.year) {
        return match api.get_course(&course.name, semester, year) {
            Ok(found) => Ok(found),
            Err(AppError::RemoteRequest { status: 404, .. }) => Err(not_found()),
            Err(err) => Err(err),
        };
    }

    let semester = course.semester.map(|semester| semester.as_str());
    api.list_courses()?
        .into_iter()
        .find(|c| c.name == course.name && c.semester.as_deref() == semester && c.year == course.year)
        .ok_or_else(not_found)
}
