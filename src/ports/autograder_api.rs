//! Grading service API port definition.

use crate::domain::{AppError, Semester};
use crate::ports::resources::{
    CommandBody, Course, CourseCopyBody, InstructorFile, NewSandboxImage, Pk, Project,
    ProjectSettingsBody, SandboxImage, SandboxImagePatch, StudentFile, StudentFileBody, TestCase,
    TestCaseBody, TestCommand, TestSuite, TestSuiteBody,
};

/// File contents to upload, named as they should appear remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub content: Vec<u8>,
}

/// Which sandbox image catalog to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageScope {
    Global,
    Course(Pk),
}

/// Port for the grading service's REST API.
///
/// Every call is a single request; non-2xx responses surface as
/// [`AppError::RemoteRequest`].
pub trait AutograderApi {
    /// Course by its (name, semester, year) key.
    fn get_course(&self, name: &str, semester: Semester, year: i32) -> Result<Course, AppError>;
    fn list_courses(&self) -> Result<Vec<Course>, AppError>;
    /// Copy a course with its projects under a new (name, semester, year).
    fn copy_course(&self, course: Pk, body: &CourseCopyBody) -> Result<Course, AppError>;

    fn list_projects(&self, course: Pk) -> Result<Vec<Project>, AppError>;
    fn create_project(&self, course: Pk, name: &str) -> Result<Project, AppError>;
    fn update_project(&self, project: Pk, settings: &ProjectSettingsBody)
    -> Result<Project, AppError>;
    /// Copy a project into `target_course`, optionally renaming it.
    fn copy_project(
        &self,
        project: Pk,
        target_course: Pk,
        new_name: Option<&str>,
    ) -> Result<Project, AppError>;

    fn list_student_files(&self, project: Pk) -> Result<Vec<StudentFile>, AppError>;
    fn create_student_file(
        &self,
        project: Pk,
        body: &StudentFileBody,
    ) -> Result<StudentFile, AppError>;
    fn update_student_file(&self, file: Pk, body: &StudentFileBody)
    -> Result<StudentFile, AppError>;

    fn list_instructor_files(&self, project: Pk) -> Result<Vec<InstructorFile>, AppError>;
    fn create_instructor_file(
        &self,
        project: Pk,
        upload: &FileUpload,
    ) -> Result<InstructorFile, AppError>;
    fn update_instructor_file_content(
        &self,
        file: Pk,
        upload: &FileUpload,
    ) -> Result<InstructorFile, AppError>;
    fn download_instructor_file(&self, file: Pk) -> Result<Vec<u8>, AppError>;

    fn list_sandbox_images(&self, scope: ImageScope) -> Result<Vec<SandboxImage>, AppError>;
    fn get_sandbox_image(&self, image: Pk) -> Result<SandboxImage, AppError>;
    /// Registers a global image. The service only allows this for superusers.
    fn create_sandbox_image(&self, body: &NewSandboxImage) -> Result<SandboxImage, AppError>;
    fn update_sandbox_image(
        &self,
        image: Pk,
        patch: &SandboxImagePatch,
    ) -> Result<SandboxImage, AppError>;

    /// Suites with their test cases and commands embedded.
    fn list_test_suites(&self, project: Pk) -> Result<Vec<TestSuite>, AppError>;
    fn create_test_suite(&self, project: Pk, body: &TestSuiteBody) -> Result<TestSuite, AppError>;
    fn update_test_suite(&self, suite: Pk, body: &TestSuiteBody) -> Result<TestSuite, AppError>;
    fn set_test_suite_order(&self, project: Pk, order: &[Pk]) -> Result<(), AppError>;

    fn create_test_case(&self, suite: Pk, body: &TestCaseBody) -> Result<TestCase, AppError>;
    fn update_test_case(&self, test: Pk, body: &TestCaseBody) -> Result<TestCase, AppError>;

    fn create_command(&self, test: Pk, body: &CommandBody) -> Result<TestCommand, AppError>;
    fn update_command(&self, command: Pk, body: &CommandBody) -> Result<TestCommand, AppError>;
}
