pub mod api_config;
pub mod config;
pub mod error;
pub mod time;

pub use api_config::ApiConfig;
pub use config::{
    AgConfig, CommandConfig, CourseSelection, CutoffPreference, Deadline, EmailReceipts,
    ExpectedStudentFile, FeedbackSetting, InstructorFileConfig, MultiCommandTestCase,
    PresetTable, ProjectConfig, ProjectSettings, Semester, SingleCommandTestCase,
    TestCaseConfig, TestSuiteConfig, UltimateSubmissionPolicy,
};
pub use error::AppError;
