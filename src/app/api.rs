//! Library entry points for the `project`, `course` and `image` commands.
//!
//! Everything except `init` locates the API token and builds an HTTP-backed context.

use std::path::Path;

use crate::adapters::autograder_http::HttpAutograderClient;
use crate::adapters::token_file::get_api_token;
use crate::app::{
    AppContext,
    commands::{copy, image, init, load, save},
};

pub use crate::app::commands::copy::ProjectCopyOptions;
pub use crate::app::commands::init::{InitOptions, InitOutcome};
pub use crate::app::commands::load::{LoadOptions, LoadOutcome};
pub use crate::app::commands::save::SaveOutcome;
pub use crate::domain::{ApiConfig, AppError, CourseSelection, CutoffPreference, Semester};
pub use crate::ports::resources::{
    Course, NewSandboxImage, Pk, Project, SandboxImage, SandboxImagePatch,
};

/// Create an `AppContext` talking to the configured grading service.
fn create_context(config: &ApiConfig) -> Result<AppContext<HttpAutograderClient>, AppError> {
    let token = get_api_token(&config.token_file)?;
    let client = HttpAutograderClient::new(token, config)?;
    Ok(AppContext::new(client))
}

/// Write a starter project config. Does not contact the grading service.
pub fn init(options: &InitOptions<'_>) -> Result<InitOutcome, AppError> {
    init::execute(options)
}

/// Export a remote project into a config file.
pub fn load(config: &ApiConfig, options: &LoadOptions<'_>) -> Result<LoadOutcome, AppError> {
    let ctx = create_context(config)?;
    load::execute(&ctx, options)
}

/// Create or update the remote project described by `config_file`.
pub fn save(config: &ApiConfig, config_file: &Path) -> Result<SaveOutcome, AppError> {
    let ctx = create_context(config)?;
    save::execute(&ctx, config_file)
}

/// Copy a project into another course, resolved by name, term and year.
pub fn copy_project(
    config: &ApiConfig,
    options: &ProjectCopyOptions<'_>,
) -> Result<Project, AppError> {
    let ctx = create_context(config)?;
    copy::copy_project(&ctx, options)
}

/// Copy a course and its projects under a new name, term and year.
pub fn copy_course(
    config: &ApiConfig,
    course: &CourseSelection,
    new_name: &str,
    new_semester: Semester,
    new_year: i32,
) -> Result<Course, AppError> {
    let ctx = create_context(config)?;
    copy::copy_course(&ctx, course, new_name, new_semester, new_year)
}

pub fn list_images(config: &ApiConfig) -> Result<Vec<SandboxImage>, AppError> {
    let ctx = create_context(config)?;
    image::list(&ctx)
}

pub fn show_image(config: &ApiConfig, pk: Pk) -> Result<SandboxImage, AppError> {
    let ctx = create_context(config)?;
    image::show(&ctx, pk)
}

pub fn create_image(config: &ApiConfig, body: &NewSandboxImage) -> Result<SandboxImage, AppError> {
    let ctx = create_context(config)?;
    image::create(&ctx, body)
}

pub fn edit_image(
    config: &ApiConfig,
    pk: Pk,
    patch: &SandboxImagePatch,
) -> Result<SandboxImage, AppError> {
    let ctx = create_context(config)?;
    image::edit(&ctx, pk, patch)
}
