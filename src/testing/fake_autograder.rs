use std::sync::Mutex;

use crate::domain::{AppError, Semester};
use crate::ports::resources::{
    CommandBody, Course, CourseCopyBody, InstructorFile, NewSandboxImage, Pk, Project,
    ProjectSettingsBody, SandboxImage, SandboxImagePatch, StudentFile, StudentFileBody, TestCase,
    TestCaseBody, TestCommand, TestSuite, TestSuiteBody,
};
use crate::ports::{AutograderApi, FileUpload, ImageScope};

/// Remote state held by [`FakeAutograder`]. Vectors keep creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeState {
    pub courses: Vec<Course>,
    /// `(course, project)`.
    pub projects: Vec<(Pk, Project)>,
    /// `(project, file)`.
    pub student_files: Vec<(Pk, StudentFile)>,
    /// `(project, file, content)`.
    pub instructor_files: Vec<(Pk, InstructorFile, Vec<u8>)>,
    pub global_images: Vec<SandboxImage>,
    /// `(course, image)`.
    pub course_images: Vec<(Pk, SandboxImage)>,
    /// `(project, suite)` with cases and commands nested, in remote order.
    pub suites: Vec<(Pk, TestSuite)>,
}

/// In-memory grading service.
pub struct FakeAutograder {
    state: Mutex<FakeState>,
    next_pk: Mutex<Pk>,
    calls: Mutex<Vec<String>>,
}

impl FakeAutograder {
    pub fn new() -> Self {
        let state = FakeState {
            global_images: vec![SandboxImage {
                pk: 1,
                display_name: "Default".to_string(),
                name: "default".to_string(),
                tag: "jameslp/autograder-sandbox:latest".to_string(),
            }],
            ..Default::default()
        };
        Self { state: Mutex::new(state), next_pk: Mutex::new(100), calls: Mutex::new(Vec::new()) }
    }

    /// Fake with one course already present.
    pub fn with_course(name: &str, semester: Semester, year: i32) -> Self {
        let fake = Self::new();
        fake.add_course(name, semester, year);
        fake
    }

    pub fn add_course(&self, name: &str, semester: Semester, year: i32) -> Pk {
        let pk = self.allocate();
        self.state.lock().unwrap().courses.push(Course {
            pk,
            name: name.to_string(),
            semester: Some(semester.as_str().to_string()),
            year: Some(year),
        });
        pk
    }

    pub fn add_course_image(&self, course: Pk, display_name: &str) -> Pk {
        let pk = self.allocate();
        self.state.lock().unwrap().course_images.push((
            course,
            SandboxImage {
                pk,
                display_name: display_name.to_string(),
                name: display_name.to_lowercase(),
                tag: format!("{}:1", display_name.to_lowercase()),
            },
        ));
        pk
    }

    pub fn snapshot(&self) -> FakeState {
        self.state.lock().unwrap().clone()
    }

    pub fn update_state(&self, edit: impl FnOnce(&mut FakeState)) {
        edit(&mut self.state.lock().unwrap());
    }

    /// Every call so far, as `"<verb> <resource>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn create_count(&self) -> usize {
        self.calls().iter().filter(|call| call.starts_with("create")).count()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn allocate(&self) -> Pk {
        let mut next = self.next_pk.lock().unwrap();
        *next += 1;
        *next
    }

    fn missing(what: &str, pk: Pk) -> AppError {
        AppError::RemoteRequest { status: 404, body: format!("{} {} not found", what, pk) }
    }

    fn find_case(state: &mut FakeState, test: Pk) -> Option<&mut TestCase> {
        state
            .suites
            .iter_mut()
            .flat_map(|(_, suite)| suite.ag_test_cases.iter_mut())
            .find(|case| case.pk == test)
    }
}

impl Default for FakeAutograder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_project_settings() -> ProjectSettingsBody {
    ProjectSettingsBody {
        guests_can_submit: false,
        soft_closing_time: None,
        closing_time: None,
        allow_late_days: false,
        ultimate_submission_policy: "most_recent".to_string(),
        min_group_size: 1,
        max_group_size: 1,
        submission_limit_per_day: None,
        allow_submissions_past_limit: true,
        groups_combine_daily_submissions: false,
        submission_limit_reset_time: "00:00:00".to_string(),
        submission_limit_reset_timezone: "UTC".to_string(),
        num_bonus_submissions: 0,
        send_email_on_submission_received: false,
        send_email_on_non_deferred_tests_finished: false,
        use_honor_pledge: false,
        honor_pledge_text: String::new(),
        total_submission_limit: None,
    }
}

impl AutograderApi for FakeAutograder {
    fn get_course(&self, name: &str, semester: Semester, year: i32) -> Result<Course, AppError> {
        self.record("get course");
        self.state
            .lock()
            .unwrap()
            .courses
            .iter()
            .find(|course| {
                course.name == name
                    && course.semester.as_deref() == Some(semester.as_str())
                    && course.year == Some(year)
            })
            .cloned()
            .ok_or_else(|| AppError::RemoteRequest { status: 404, body: "Not found.".into() })
    }

    fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.record("list courses");
        Ok(self.state.lock().unwrap().courses.clone())
    }

    fn copy_course(&self, course: Pk, body: &CourseCopyBody) -> Result<Course, AppError> {
        self.record("copy course");
        let mut state = self.state.lock().unwrap();
        if !state.courses.iter().any(|c| c.pk == course) {
            return Err(Self::missing("course", course));
        }
        let copy = Course {
            pk: self.allocate(),
            name: body.new_name.clone(),
            semester: Some(body.new_semester.clone()),
            year: Some(body.new_year),
        };
        let projects: Vec<Project> =
            state.projects.iter().filter(|(c, _)| *c == course).map(|(_, p)| p.clone()).collect();
        for project in projects {
            let pk = self.allocate();
            state.projects.push((copy.pk, Project { pk, ..project }));
        }
        state.courses.push(copy.clone());
        Ok(copy)
    }

    fn list_projects(&self, course: Pk) -> Result<Vec<Project>, AppError> {
        self.record("list projects");
        let state = self.state.lock().unwrap();
        Ok(state.projects.iter().filter(|(c, _)| *c == course).map(|(_, p)| p.clone()).collect())
    }

    fn create_project(&self, course: Pk, name: &str) -> Result<Project, AppError> {
        self.record("create project");
        let project =
            Project { pk: self.allocate(), name: name.to_string(), settings: default_project_settings() };
        self.state.lock().unwrap().projects.push((course, project.clone()));
        Ok(project)
    }

    fn update_project(
        &self,
        project: Pk,
        settings: &ProjectSettingsBody,
    ) -> Result<Project, AppError> {
        self.record("update project");
        let mut state = self.state.lock().unwrap();
        let (_, existing) = state
            .projects
            .iter_mut()
            .find(|(_, p)| p.pk == project)
            .ok_or_else(|| Self::missing("project", project))?;
        existing.settings = settings.clone();
        Ok(existing.clone())
    }

    fn copy_project(
        &self,
        project: Pk,
        target_course: Pk,
        new_name: Option<&str>,
    ) -> Result<Project, AppError> {
        self.record("copy project");
        let mut state = self.state.lock().unwrap();
        if !state.courses.iter().any(|c| c.pk == target_course) {
            return Err(Self::missing("course", target_course));
        }
        let source = state
            .projects
            .iter()
            .find(|(_, p)| p.pk == project)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| Self::missing("project", project))?;
        let copy = Project {
            pk: self.allocate(),
            name: new_name.map_or_else(|| source.name.clone(), str::to_string),
            settings: source.settings,
        };
        state.projects.push((target_course, copy.clone()));
        Ok(copy)
    }

    fn list_student_files(&self, project: Pk) -> Result<Vec<StudentFile>, AppError> {
        self.record("list student_files");
        let state = self.state.lock().unwrap();
        Ok(state.student_files.iter().filter(|(p, _)| *p == project).map(|(_, f)| f.clone()).collect())
    }

    fn create_student_file(
        &self,
        project: Pk,
        body: &StudentFileBody,
    ) -> Result<StudentFile, AppError> {
        self.record("create student_file");
        let file = StudentFile { pk: self.allocate(), body: body.clone() };
        self.state.lock().unwrap().student_files.push((project, file.clone()));
        Ok(file)
    }

    fn update_student_file(
        &self,
        file: Pk,
        body: &StudentFileBody,
    ) -> Result<StudentFile, AppError> {
        self.record("update student_file");
        let mut state = self.state.lock().unwrap();
        let (_, existing) = state
            .student_files
            .iter_mut()
            .find(|(_, f)| f.pk == file)
            .ok_or_else(|| Self::missing("student file", file))?;
        existing.body = body.clone();
        Ok(existing.clone())
    }

    fn list_instructor_files(&self, project: Pk) -> Result<Vec<InstructorFile>, AppError> {
        self.record("list instructor_files");
        let state = self.state.lock().unwrap();
        Ok(state
            .instructor_files
            .iter()
            .filter(|(p, _, _)| *p == project)
            .map(|(_, f, _)| f.clone())
            .collect())
    }

    fn create_instructor_file(
        &self,
        project: Pk,
        upload: &FileUpload,
    ) -> Result<InstructorFile, AppError> {
        self.record("create instructor_file");
        let file = InstructorFile { pk: self.allocate(), name: upload.name.clone() };
        self.state.lock().unwrap().instructor_files.push((project, file.clone(), upload.content.clone()));
        Ok(file)
    }

    fn update_instructor_file_content(
        &self,
        file: Pk,
        upload: &FileUpload,
    ) -> Result<InstructorFile, AppError> {
        self.record("update instructor_file");
        let mut state = self.state.lock().unwrap();
        let (_, existing, content) = state
            .instructor_files
            .iter_mut()
            .find(|(_, f, _)| f.pk == file)
            .ok_or_else(|| Self::missing("instructor file", file))?;
        *content = upload.content.clone();
        Ok(existing.clone())
    }

    fn download_instructor_file(&self, file: Pk) -> Result<Vec<u8>, AppError> {
        self.record("download instructor_file");
        let state = self.state.lock().unwrap();
        state
            .instructor_files
            .iter()
            .find(|(_, f, _)| f.pk == file)
            .map(|(_, _, content)| content.clone())
            .ok_or_else(|| Self::missing("instructor file", file))
    }

    fn list_sandbox_images(&self, scope: ImageScope) -> Result<Vec<SandboxImage>, AppError> {
        self.record("list sandbox_images");
        let state = self.state.lock().unwrap();
        Ok(match scope {
            ImageScope::Global => state.global_images.clone(),
            ImageScope::Course(course) => state
                .course_images
                .iter()
                .filter(|(c, _)| *c == course)
                .map(|(_, image)| image.clone())
                .collect(),
        })
    }

    fn get_sandbox_image(&self, image: Pk) -> Result<SandboxImage, AppError> {
        self.record("get sandbox_image");
        let state = self.state.lock().unwrap();
        state
            .global_images
            .iter()
            .chain(state.course_images.iter().map(|(_, image)| image))
            .find(|candidate| candidate.pk == image)
            .cloned()
            .ok_or_else(|| Self::missing("sandbox image", image))
    }

    fn create_sandbox_image(&self, body: &NewSandboxImage) -> Result<SandboxImage, AppError> {
        self.record("create sandbox_image");
        let image = SandboxImage {
            pk: self.allocate(),
            name: body.name.clone(),
            display_name: body.display_name.clone(),
            tag: body.tag.clone(),
        };
        self.state.lock().unwrap().global_images.push(image.clone());
        Ok(image)
    }

    fn update_sandbox_image(
        &self,
        image: Pk,
        patch: &SandboxImagePatch,
    ) -> Result<SandboxImage, AppError> {
        self.record("update sandbox_image");
        let mut state = self.state.lock().unwrap();
        let FakeState { global_images, course_images, .. } = &mut *state;
        let existing = global_images
            .iter_mut()
            .chain(course_images.iter_mut().map(|(_, image)| image))
            .find(|candidate| candidate.pk == image)
            .ok_or_else(|| Self::missing("sandbox image", image))?;
        if let Some(display_name) = &patch.display_name {
            existing.display_name = display_name.clone();
        }
        if let Some(tag) = &patch.tag {
            existing.tag = tag.clone();
        }
        Ok(existing.clone())
    }

    fn list_test_suites(&self, project: Pk) -> Result<Vec<TestSuite>, AppError> {
        self.record("list test_suites");
        let state = self.state.lock().unwrap();
        Ok(state.suites.iter().filter(|(p, _)| *p == project).map(|(_, s)| s.clone()).collect())
    }

    fn create_test_suite(&self, project: Pk, body: &TestSuiteBody) -> Result<TestSuite, AppError> {
        self.record("create test_suite");
        let suite = TestSuite { pk: self.allocate(), body: body.clone(), ag_test_cases: Vec::new() };
        self.state.lock().unwrap().suites.push((project, suite.clone()));
        Ok(suite)
    }

    fn update_test_suite(&self, suite: Pk, body: &TestSuiteBody) -> Result<TestSuite, AppError> {
        self.record("update test_suite");
        let mut state = self.state.lock().unwrap();
        let (_, existing) = state
            .suites
            .iter_mut()
            .find(|(_, s)| s.pk == suite)
            .ok_or_else(|| Self::missing("suite", suite))?;
        existing.body = body.clone();
        Ok(existing.clone())
    }

    fn set_test_suite_order(&self, project: Pk, order: &[Pk]) -> Result<(), AppError> {
        self.record("order test_suites");
        let mut state = self.state.lock().unwrap();
        let (mut owned, others): (Vec<_>, Vec<_>) =
            state.suites.drain(..).partition(|(p, _)| *p == project);
        if owned.len() != order.len() {
            return Err(AppError::RemoteRequest {
                status: 400,
                body: "Order must contain every suite".into(),
            });
        }
        owned.sort_by_key(|(_, suite)| order.iter().position(|pk| *pk == suite.pk));
        state.suites = others;
        state.suites.extend(owned);
        Ok(())
    }

    fn create_test_case(&self, suite: Pk, body: &TestCaseBody) -> Result<TestCase, AppError> {
        self.record("create test_case");
        let case = TestCase { pk: self.allocate(), body: body.clone(), ag_test_commands: Vec::new() };
        let mut state = self.state.lock().unwrap();
        let (_, existing) = state
            .suites
            .iter_mut()
            .find(|(_, s)| s.pk == suite)
            .ok_or_else(|| Self::missing("suite", suite))?;
        existing.ag_test_cases.push(case.clone());
        Ok(case)
    }

    fn update_test_case(&self, test: Pk, body: &TestCaseBody) -> Result<TestCase, AppError> {
        self.record("update test_case");
        let mut state = self.state.lock().unwrap();
        let case = Self::find_case(&mut state, test).ok_or_else(|| Self::missing("test", test))?;
        case.body = body.clone();
        Ok(case.clone())
    }

    fn create_command(&self, test: Pk, body: &CommandBody) -> Result<TestCommand, AppError> {
        self.record("create command");
        let command = TestCommand { pk: self.allocate(), body: body.clone() };
        let mut state = self.state.lock().unwrap();
        let case = Self::find_case(&mut state, test).ok_or_else(|| Self::missing("test", test))?;
        case.ag_test_commands.push(command.clone());
        Ok(command)
    }

    fn update_command(&self, command: Pk, body: &CommandBody) -> Result<TestCommand, AppError> {
        self.record("update command");
        let mut state = self.state.lock().unwrap();
        let existing = state
            .suites
            .iter_mut()
            .flat_map(|(_, suite)| suite.ag_test_cases.iter_mut())
            .flat_map(|case| case.ag_test_commands.iter_mut())
            .find(|c| c.pk == command)
            .ok_or_else(|| Self::missing("command", command))?;
        existing.body = body.clone();
        Ok(existing.clone())
    }
}
