//! Connection settings for the grading service API.

use url::Url;

use crate::domain::AppError;

pub const DEFAULT_BASE_URL: &str = "https://autograder.io/";
pub const DEFAULT_TOKEN_FILE: &str = ".agtoken";

/// Where and how to reach the grading service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Service root; API paths are resolved relative to it.
    pub base_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Bare token file name (searched upward from the working directory) or a path.
    pub token_file: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            token_file: DEFAULT_TOKEN_FILE.to_string(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.timeout_secs == 0 {
            return Err(AppError::config_error("timeout_secs must be greater than 0"));
        }
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(AppError::config_error(format!(
                "base_url must use http or https, got '{}'",
                self.base_url
            )));
        }
        if self.base_url.cannot_be_a_base() {
            return Err(AppError::config_error(format!(
                "base_url '{}' cannot be used as a base URL",
                self.base_url
            )));
        }
        if self.token_file.trim().is_empty() {
            return Err(AppError::config_error("token_file must not be empty"));
        }
        Ok(())
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("Default base URL must be valid")
}

fn default_timeout() -> u64 {
    30
}
