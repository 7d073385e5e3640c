//! API token discovery on the local filesystem.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::AppError;

/// Locate and read the API token named by `token_file`.
///
/// A value with a directory component is read as a path. A bare file name is searched for
/// from the current directory upward to the home directory.
pub fn get_api_token(token_file: &str) -> Result<String, AppError> {
    let cwd = env::current_dir()?;
    let home = home_dir();
    find_api_token(token_file, &cwd, home.as_deref())
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").filter(|value| !value.is_empty()).map(PathBuf::from)
}

pub(crate) fn find_api_token(
    token_file: &str,
    cwd: &Path,
    home: Option<&Path>,
) -> Result<String, AppError> {
    let not_found = || AppError::TokenFileNotFound(token_file.to_string());

    let requested = Path::new(token_file);
    let has_directory = requested.parent().is_some_and(|parent| !parent.as_os_str().is_empty());
    if has_directory {
        if !requested.is_file() {
            return Err(not_found());
        }
        return read_token(requested);
    }

    let home = home.ok_or_else(not_found)?;
    if !cwd.starts_with(home) {
        return Err(not_found());
    }

    for dir in cwd.ancestors() {
        let candidate = dir.join(token_file);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using token file");
            return read_token(&candidate);
        }
        if dir == home {
            break;
        }
    }
    Err(not_found())
}

fn read_token(path: &Path) -> Result<String, AppError> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}
