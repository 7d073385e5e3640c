use include_dir::{Dir, include_dir};
use minijinja::{AutoEscape, Environment, UndefinedBehavior, context};

use crate::domain::{AppError, Semester};

static INIT_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/assets/init");

const CONFIG_TEMPLATE: &str = "ag_project.yml.jinja";
pub const INSTRUCTOR_FILE_NAME: &str = "instructor_file.txt";

/// Values substituted into the starter config.
#[derive(Debug, Clone)]
pub struct InitTemplateValues<'a> {
    pub project_name: &'a str,
    pub course_name: &'a str,
    pub semester: Semester,
    pub year: i32,
    pub timezone: &'a str,
}

fn asset_content(path: &str) -> Result<&'static str, AppError> {
    let file = INIT_DIR
        .get_file(path)
        .ok_or_else(|| AppError::Internal(format!("Missing init asset {}", path)))?;
    file.contents_utf8()
        .ok_or_else(|| AppError::Internal(format!("Init asset {} is not UTF-8", path)))
}

/// Quote a value as a YAML flow scalar. JSON strings are valid YAML.
fn yaml_quote(value: &str) -> Result<String, AppError> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("Failed to quote '{}': {}", value, e)))
}

/// Render the starter `ag_project.yml`.
pub fn render_init_config(values: &InitTemplateValues<'_>) -> Result<String, AppError> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    // Values arrive pre-quoted.
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_template(CONFIG_TEMPLATE, asset_content(CONFIG_TEMPLATE)?).map_err(|e| {
        AppError::Internal(format!("Failed to register template '{}': {}", CONFIG_TEMPLATE, e))
    })?;

    let project_name = yaml_quote(values.project_name)?;
    let course_name = yaml_quote(values.course_name)?;
    let timezone = yaml_quote(values.timezone)?;
    let ctx = context! {
        project_name,
        course_name,
        semester => values.semester.as_str(),
        year => values.year,
        timezone,
    };

    let template = env.get_template(CONFIG_TEMPLATE).map_err(|e| {
        AppError::Internal(format!("Failed to load template '{}': {}", CONFIG_TEMPLATE, e))
    })?;
    template.render(ctx).map_err(|e| {
        AppError::Internal(format!("Failed to render template '{}': {}", CONFIG_TEMPLATE, e))
    })
}

/// Placeholder contents for the starter instructor file.
pub fn instructor_file_placeholder() -> Result<&'static str, AppError> {
    asset_content(INSTRUCTOR_FILE_NAME)
}
