//! CLI Adapter.

mod course;
mod image;
mod project;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use url::Url;

use crate::app::api::{NewSandboxImage, Pk, ProjectCopyOptions, SandboxImagePatch};
use crate::app::logging;
use crate::domain::api_config::{DEFAULT_BASE_URL, DEFAULT_TOKEN_FILE};
use crate::domain::{ApiConfig, AppError, CourseSelection, CutoffPreference, Semester};

const DEFAULT_CONFIG_FILE: &str = "ag_project.yml";

#[derive(Parser)]
#[command(name = "agsync")]
#[command(version)]
#[command(
    about = "Keep autograder.io projects in sync with a declarative YAML config",
    long_about = None
)]
struct Cli {
    /// Grading service root URL
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: Url,
    /// Token file name searched upward from the current directory, or a path to one
    #[arg(long, global = true, default_value = DEFAULT_TOKEN_FILE)]
    token_file: String,
    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, export or push a project config
    #[clap(visible_alias = "p")]
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Copy courses
    #[clap(visible_alias = "c")]
    Course {
        #[command(subcommand)]
        command: CourseCommands,
    },
    /// Inspect and maintain sandbox images
    #[clap(visible_alias = "i")]
    Image {
        #[command(subcommand)]
        command: ImageCommands,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Write a starter config file
    Init {
        /// Course name
        course_name: String,
        /// Fall, Winter, Spring or Summer
        term: Semester,
        year: i32,
        project_name: String,
        /// Config file to create
        #[arg(short = 'f', long, default_value = DEFAULT_CONFIG_FILE)]
        config_file: PathBuf,
        /// IANA timezone for deadlines
        #[arg(long, default_value = "UTC")]
        timezone: String,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Export a remote project into a config file
    Load {
        course_name: String,
        /// Fall, Winter, Spring or Summer
        term: Semester,
        year: i32,
        project_name: String,
        output_file: PathBuf,
        /// How to write a deadline that has both a soft and a hard closing time
        #[arg(short = 'd', long = "deadline-cutoff-preference", default_value = "fixed")]
        cutoff: CutoffPreference,
    },
    /// Create or update the remote project described by a config file
    Save {
        #[arg(short = 'f', long, default_value = DEFAULT_CONFIG_FILE)]
        config_file: PathBuf,
    },
    /// Copy a project, with its files and test suites, into another course
    Copy {
        course_name: String,
        term: Semester,
        year: i32,
        project_name: String,
        /// Course to copy into
        target_course_name: String,
        target_term: Semester,
        target_year: i32,
        /// Name for the copy (defaults to the source name)
        #[arg(long)]
        new_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum CourseCommands {
    /// Copy a course and its projects under a new name, term and year
    Copy {
        course_name: String,
        term: Semester,
        year: i32,
        new_name: String,
        new_term: Semester,
        new_year: i32,
    },
}

#[derive(Subcommand)]
enum ImageCommands {
    /// List global sandbox images with their primary keys
    List,
    /// Show one image
    Show { pk: Pk },
    /// Register a new image (superusers only)
    Create {
        /// Unique image name
        name: String,
        /// Name shown on the website and used in config files
        display_name: String,
        /// Argument to `docker pull`. Include a version so updates are picked up.
        tag: String,
    },
    /// Change an image's display name or tag (superusers only)
    Edit {
        pk: Pk,
        #[arg(short = 'd', long)]
        display_name: Option<String>,
        #[arg(short = 't', long)]
        tag: Option<String>,
    },
}

/// Entry point for the CLI.
pub fn run() {
    let cli = Cli::parse();

    let result = logging::init_logging(cli.verbose).and_then(|()| dispatch(cli));
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<(), AppError> {
    let api_config =
        ApiConfig { base_url: cli.base_url, timeout_secs: cli.timeout, token_file: cli.token_file };

    match cli.command {
        Commands::Project { command } => match command {
            ProjectCommands::Init {
                course_name,
                term,
                year,
                project_name,
                config_file,
                timezone,
                force,
            } => project::run_init(
                &course_name,
                term,
                year,
                &project_name,
                &config_file,
                &timezone,
                force,
            ),
            ProjectCommands::Load { course_name, term, year, project_name, output_file, cutoff } => {
                project::run_load(
                    &api_config,
                    &course_name,
                    term,
                    year,
                    &project_name,
                    &output_file,
                    cutoff,
                )
            }
            ProjectCommands::Save { config_file } => project::run_save(&api_config, &config_file),
            ProjectCommands::Copy {
                course_name,
                term,
                year,
                project_name,
                target_course_name,
                target_term,
                target_year,
                new_name,
            } => project::run_copy(
                &api_config,
                &ProjectCopyOptions {
                    course: selection(course_name, term, year),
                    project_name: &project_name,
                    target_course: selection(target_course_name, target_term, target_year),
                    new_name: new_name.as_deref(),
                },
            ),
        },
        Commands::Course { command } => match command {
            CourseCommands::Copy { course_name, term, year, new_name, new_term, new_year } => {
                course::run_copy(
                    &api_config,
                    &selection(course_name, term, year),
                    &new_name,
                    new_term,
                    new_year,
                )
            }
        },
        Commands::Image { command } => match command {
            ImageCommands::List => image::run_list(&api_config),
            ImageCommands::Show { pk } => image::run_show(&api_config, pk),
            ImageCommands::Create { name, display_name, tag } => {
                image::run_create(&api_config, &NewSandboxImage { name, display_name, tag })
            }
            ImageCommands::Edit { pk, display_name, tag } => {
                image::run_edit(&api_config, pk, &SandboxImagePatch { display_name, tag })
            }
        },
    }
}

fn selection(name: String, semester: Semester, year: i32) -> CourseSelection {
    CourseSelection { name, semester: Some(semester), year: Some(year) }
}
