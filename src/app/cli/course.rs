//! Course subcommand implementations.

use crate::app::api;
use crate::domain::{ApiConfig, AppError, CourseSelection, Semester};

pub fn run_copy(
    api_config: &ApiConfig,
    course: &CourseSelection,
    new_name: &str,
    new_semester: Semester,
    new_year: i32,
) -> Result<(), AppError> {
    let copy = api::copy_course(api_config, course, new_name, new_semester, new_year)?;
    println!(
        "✅ Copied \"{}\" to \"{} {} {}\" (pk {})",
        course, new_name, new_semester, new_year, copy.pk
    );
    Ok(())
}
