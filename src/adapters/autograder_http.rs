//! Grading service API client implementation using reqwest.

use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::domain::{ApiConfig, AppError, Semester};
use crate::ports::resources::{
    CommandBody, Course, CourseCopyBody, InstructorFile, NewSandboxImage, Pk, Project,
    ProjectSettingsBody, SandboxImage, SandboxImagePatch, StudentFile, StudentFileBody, TestCase,
    TestCaseBody, TestCommand, TestSuite, TestSuiteBody,
};
use crate::ports::{AutograderApi, FileUpload, ImageScope};

const UPLOAD_FIELD: &str = "file_obj";

/// HTTP transport for the grading service. One request per call, no retries.
#[derive(Clone)]
pub struct HttpAutograderClient {
    token: String,
    base_url: Url,
    client: Client,
}

impl std::fmt::Debug for HttpAutograderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAutograderClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl HttpAutograderClient {
    pub fn new(token: String, config: &ApiConfig) -> Result<Self, AppError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { token, base_url: config.base_url.clone(), client })
    }

    /// `base_url` + segments, always with a trailing slash.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::config_error(format!("'{}' cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, AppError> {
        let response = request
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .send()
            .map_err(|e| AppError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(AppError::RemoteRequest { status: status.as_u16(), body })
    }

    fn read_json<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, AppError> {
        let text = response.text().map_err(|e| AppError::Http(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| AppError::InvalidResponse {
            url: url.to_string(),
            details: e.to_string(),
        })
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, AppError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "GET");
        let response = self.send(self.client.get(url.clone()))?;
        Self::read_json(&url, response)
    }

    fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T, AppError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, %method, "sending JSON");
        let response = self.send(self.client.request(method, url.clone()).json(body))?;
        Self::read_json(&url, response)
    }

    fn send_file(
        &self,
        method: Method,
        segments: &[&str],
        upload: &FileUpload,
    ) -> Result<InstructorFile, AppError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, %method, file = %upload.name, "uploading");
        let part = Part::bytes(upload.content.clone()).file_name(upload.name.clone());
        let form = Form::new().part(UPLOAD_FIELD, part);
        let response = self.send(self.client.request(method, url.clone()).multipart(form))?;
        Self::read_json(&url, response)
    }
}

impl AutograderApi for HttpAutograderClient {
    fn get_course(&self, name: &str, semester: Semester, year: i32) -> Result<Course, AppError> {
        self.get(&["api", "course", name, semester.as_str(), &year.to_string()])
    }

    fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.get(&["api", "courses"])
    }

    fn copy_course(&self, course: Pk, body: &CourseCopyBody) -> Result<Course, AppError> {
        self.send_json(Method::POST, &["api", "courses", &course.to_string(), "copy"], body)
    }

    fn list_projects(&self, course: Pk) -> Result<Vec<Project>, AppError> {
        self.get(&["api", "courses", &course.to_string(), "projects"])
    }

    fn create_project(&self, course: Pk, name: &str) -> Result<Project, AppError> {
        let body = serde_json::json!({ "name": name });
        self.send_json(Method::POST, &["api", "courses", &course.to_string(), "projects"], &body)
    }

    fn update_project(
        &self,
        project: Pk,
        settings: &ProjectSettingsBody,
    ) -> Result<Project, AppError> {
        self.send_json(Method::PATCH, &["api", "projects", &project.to_string()], settings)
    }

    fn copy_project(
        &self,
        project: Pk,
        target_course: Pk,
        new_name: Option<&str>,
    ) -> Result<Project, AppError> {
        let mut url = self.endpoint(&[
            "api",
            "projects",
            &project.to_string(),
            "copy_to_course",
            &target_course.to_string(),
        ])?;
        if let Some(name) = new_name {
            url.query_pairs_mut().append_pair("new_project_name", name);
        }
        tracing::debug!(%url, "copying project");
        let response = self.send(self.client.post(url.clone()))?;
        Self::read_json(&url, response)
    }

    fn list_student_files(&self, project: Pk) -> Result<Vec<StudentFile>, AppError> {
        self.get(&["api", "projects", &project.to_string(), "expected_student_files"])
    }

    fn create_student_file(
        &self,
        project: Pk,
        body: &StudentFileBody,
    ) -> Result<StudentFile, AppError> {
        self.send_json(
            Method::POST,
            &["api", "projects", &project.to_string(), "expected_student_files"],
            body,
        )
    }

    fn update_student_file(
        &self,
        file: Pk,
        body: &StudentFileBody,
    ) -> Result<StudentFile, AppError> {
        self.send_json(Method::PATCH, &["api", "expected_student_files", &file.to_string()], body)
    }

    fn list_instructor_files(&self, project: Pk) -> Result<Vec<InstructorFile>, AppError> {
        self.get(&["api", "projects", &project.to_string(), "instructor_files"])
    }

    fn create_instructor_file(
        &self,
        project: Pk,
        upload: &FileUpload,
    ) -> Result<InstructorFile, AppError> {
        self.send_file(
            Method::POST,
            &["api", "projects", &project.to_string(), "instructor_files"],
            upload,
        )
    }

    fn update_instructor_file_content(
        &self,
        file: Pk,
        upload: &FileUpload,
    ) -> Result<InstructorFile, AppError> {
        self.send_file(
            Method::PUT,
            &["api", "instructor_files", &file.to_string(), "content"],
            upload,
        )
    }

    fn download_instructor_file(&self, file: Pk) -> Result<Vec<u8>, AppError> {
        let url = self.endpoint(&["api", "instructor_files", &file.to_string(), "content"])?;
        let response = self.send(self.client.get(url))?;
        let bytes = response.bytes().map_err(|e| AppError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn list_sandbox_images(&self, scope: ImageScope) -> Result<Vec<SandboxImage>, AppError> {
        match scope {
            ImageScope::Global => self.get(&["api", "sandbox_docker_images"]),
            ImageScope::Course(course) => {
                self.get(&["api", "courses", &course.to_string(), "sandbox_docker_images"])
            }
        }
    }

    fn get_sandbox_image(&self, image: Pk) -> Result<SandboxImage, AppError> {
        self.get(&["api", "sandbox_docker_images", &image.to_string()])
    }

    fn create_sandbox_image(&self, body: &NewSandboxImage) -> Result<SandboxImage, AppError> {
        self.send_json(Method::POST, &["api", "sandbox_docker_images"], body)
    }

    fn update_sandbox_image(
        &self,
        image: Pk,
        patch: &SandboxImagePatch,
    ) -> Result<SandboxImage, AppError> {
        self.send_json(Method::PATCH, &["api", "sandbox_docker_images", &image.to_string()], patch)
    }

    fn list_test_suites(&self, project: Pk) -> Result<Vec<TestSuite>, AppError> {
        self.get(&["api", "projects", &project.to_string(), "ag_test_suites"])
    }

    fn create_test_suite(&self, project: Pk, body: &TestSuiteBody) -> Result<TestSuite, AppError> {
        self.send_json(
            Method::POST,
            &["api", "projects", &project.to_string(), "ag_test_suites"],
            body,
        )
    }

    fn update_test_suite(&self, suite: Pk, body: &TestSuiteBody) -> Result<TestSuite, AppError> {
        self.send_json(Method::PATCH, &["api", "ag_test_suites", &suite.to_string()], body)
    }

    fn set_test_suite_order(&self, project: Pk, order: &[Pk]) -> Result<(), AppError> {
        let url =
            self.endpoint(&["api", "projects", &project.to_string(), "ag_test_suites", "order"])?;
        self.send(self.client.put(url).json(order))?;
        Ok(())
    }

    fn create_test_case(&self, suite: Pk, body: &TestCaseBody) -> Result<TestCase, AppError> {
        self.send_json(
            Method::POST,
            &["api", "ag_test_suites", &suite.to_string(), "ag_test_cases"],
            body,
        )
    }

    fn update_test_case(&self, test: Pk, body: &TestCaseBody) -> Result<TestCase, AppError> {
        self.send_json(Method::PATCH, &["api", "ag_test_cases", &test.to_string()], body)
    }

    fn create_command(&self, test: Pk, body: &CommandBody) -> Result<TestCommand, AppError> {
        self.send_json(
            Method::POST,
            &["api", "ag_test_cases", &test.to_string(), "ag_test_commands"],
            body,
        )
    }

    fn update_command(&self, command: Pk, body: &CommandBody) -> Result<TestCommand, AppError> {
        self.send_json(Method::PATCH, &["api", "ag_test_commands", &command.to_string()], body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> HttpAutograderClient {
        let config = ApiConfig {
            base_url: Url::parse(&format!("{}/", server.url())).unwrap(),
            timeout_secs: 5,
            ..Default::default()
        };
        HttpAutograderClient::new("secret".to_string(), &config).unwrap()
    }

    #[test]
    fn debug_output_redacts_token() {
        let client =
            HttpAutograderClient::new("secret".to_string(), &ApiConfig::default()).unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn endpoints_keep_base_path_and_trailing_slash() {
        let config = ApiConfig {
            base_url: Url::parse("https://example.com/grader/").unwrap(),
            ..Default::default()
        };
        let client = HttpAutograderClient::new("t".to_string(), &config).unwrap();
        let url = client.endpoint(&["api", "course", "EECS 280", "Fall", "2024"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/grader/api/course/EECS%20280/Fall/2024/");
    }

    #[test]
    fn get_course_sends_token_and_parses_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/api/course/EECS280/Fall/2024/")
            .match_header("authorization", "Token secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"pk": 3, "name": "EECS280", "semester": "Fall", "year": 2024}"#)
            .expect(1)
            .create();

        let course = client_for(&server).get_course("EECS280", Semester::Fall, 2024).unwrap();

        mock.assert();
        assert_eq!(course.pk, 3);
        assert_eq!(course.semester.as_deref(), Some("Fall"));
    }

    #[test]
    fn non_success_status_carries_code_and_body() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/api/courses/3/projects/")
            .with_status(400)
            .with_body(r#"{"name": ["This field must be unique."]}"#)
            .create();

        let err = client_for(&server).create_project(3, "P1").unwrap_err();
        match err {
            AppError::RemoteRequest { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("must be unique"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn create_project_posts_name() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/courses/3/projects/")
            .match_body(Matcher::Json(json!({"name": "P1"})))
            .with_status(201)
            .with_body(
                json!({
                    "pk": 11,
                    "name": "P1",
                    "guests_can_submit": false,
                    "allow_late_days": false,
                    "ultimate_submission_policy": "most_recent",
                    "min_group_size": 1,
                    "max_group_size": 1,
                    "allow_submissions_past_limit": true,
                    "groups_combine_daily_submissions": false,
                    "submission_limit_reset_time": "00:00:00",
                    "submission_limit_reset_timezone": "UTC",
                    "num_bonus_submissions": 0,
                    "send_email_on_submission_received": false,
                    "send_email_on_non_deferred_tests_finished": false,
                    "use_honor_pledge": false,
                    "honor_pledge_text": ""
                })
                .to_string(),
            )
            .expect(1)
            .create();

        let project = client_for(&server).create_project(3, "P1").unwrap();
        mock.assert();
        assert_eq!(project.pk, 11);
    }

    #[test]
    fn instructor_file_upload_is_multipart() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("PUT", "/api/instructor_files/5/content/")
            .match_header("content-type", Matcher::Regex("multipart/form-data".to_string()))
            .match_body(Matcher::Regex(r#"name="file_obj"; filename="in.txt""#.to_string()))
            .with_status(200)
            .with_body(r#"{"pk": 5, "name": "in.txt", "size": 5}"#)
            .expect(1)
            .create();

        let upload = FileUpload { name: "in.txt".to_string(), content: b"hello".to_vec() };
        let file = client_for(&server).update_instructor_file_content(5, &upload).unwrap();

        mock.assert();
        assert_eq!(file, InstructorFile { pk: 5, name: "in.txt".to_string() });
    }

    #[test]
    fn suite_order_is_put_as_pk_list() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("PUT", "/api/projects/4/ag_test_suites/order/")
            .match_body(Matcher::Json(json!([9, 7])))
            .with_status(200)
            .with_body("[9, 7]")
            .expect(1)
            .create();

        client_for(&server).set_test_suite_order(4, &[9, 7]).unwrap();
        mock.assert();
    }

    #[test]
    fn image_patch_sends_only_given_fields() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("PATCH", "/api/sandbox_docker_images/8/")
            .match_body(Matcher::Json(json!({"tag": "eecs280:2"})))
            .with_status(200)
            .with_body(r#"{"pk": 8, "name": "eecs280", "display_name": "EECS 280", "tag": "eecs280:2"}"#)
            .expect(1)
            .create();

        let patch = SandboxImagePatch { display_name: None, tag: Some("eecs280:2".to_string()) };
        let image = client_for(&server).update_sandbox_image(8, &patch).unwrap();

        mock.assert();
        assert_eq!(image.tag, "eecs280:2");
    }

    #[test]
    fn copy_project_passes_new_name_as_query() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/projects/4/copy_to_course/9/")
            .match_query(Matcher::UrlEncoded("new_project_name".into(), "Project 1 copy".into()))
            .with_status(201)
            .with_body(
                json!({
                    "pk": 12,
                    "name": "Project 1 copy",
                    "guests_can_submit": false,
                    "allow_late_days": false,
                    "ultimate_submission_policy": "most_recent",
                    "min_group_size": 1,
                    "max_group_size": 1,
                    "allow_submissions_past_limit": true,
                    "groups_combine_daily_submissions": false,
                    "submission_limit_reset_time": "00:00:00",
                    "submission_limit_reset_timezone": "UTC",
                    "num_bonus_submissions": 0,
                    "send_email_on_submission_received": false,
                    "send_email_on_non_deferred_tests_finished": false,
                    "use_honor_pledge": false,
                    "honor_pledge_text": ""
                })
                .to_string(),
            )
            .expect(1)
            .create();

        let project = client_for(&server).copy_project(4, 9, Some("Project 1 copy")).unwrap();

        mock.assert();
        assert_eq!(project.pk, 12);
    }

    #[test]
    fn copy_course_posts_new_coordinates() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/courses/3/copy/")
            .match_body(Matcher::Json(
                json!({"new_name": "EECS280", "new_semester": "Winter", "new_year": 2025}),
            ))
            .with_status(201)
            .with_body(r#"{"pk": 30, "name": "EECS280", "semester": "Winter", "year": 2025}"#)
            .expect(1)
            .create();

        let body = CourseCopyBody {
            new_name: "EECS280".to_string(),
            new_semester: "Winter".to_string(),
            new_year: 2025,
        };
        let course = client_for(&server).copy_course(3, &body).unwrap();

        mock.assert();
        assert_eq!(course.pk, 30);
    }

    #[test]
    fn download_returns_raw_bytes() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/api/instructor_files/5/content/")
            .with_status(200)
            .with_body("raw contents\n")
            .create();

        let bytes = client_for(&server).download_instructor_file(5).unwrap();
        assert_eq!(bytes, b"raw contents\n");
    }

    #[test]
    fn malformed_body_is_invalid_response() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/api/courses/").with_status(200).with_body("<html>").create();

        let err = client_for(&server).list_courses().unwrap_err();
        assert!(matches!(err, AppError::InvalidResponse { .. }));
    }

    #[test]
    fn unreachable_server_is_transport_error() {
        let config = ApiConfig {
            base_url: Url::parse("http://127.0.0.1:1/").unwrap(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = HttpAutograderClient::new("t".to_string(), &config).unwrap();
        assert!(matches!(client.list_courses(), Err(AppError::Http(_))));
    }
}
