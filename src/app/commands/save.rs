//! Push a config document to the grading service with create-or-update semantics.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::lookup::resolve_project;
use crate::app::AppContext;
use crate::domain::config::{
    OutputCheckWithDeduction, ReturnCodeCheckWithDeduction, TestCaseFeedbackConfig,
    TestCaseFeedbackSettings, to_remote_window,
};
use crate::domain::time;
use crate::domain::{
    AgConfig, AppError, CommandConfig, MultiCommandTestCase, PresetTable, ProjectConfig,
    SingleCommandTestCase, TestCaseConfig, TestSuiteConfig,
};
use crate::ports::resources::{
    CommandBody, Course, InstructorFile, Pk, Project, ProjectSettingsBody, SandboxImage,
    StudentFile, StudentFileBody, TestCase, TestCaseBody, TestCommand, TestSuite, TestSuiteBody,
};
use crate::ports::{AutograderApi, FileUpload, ImageScope};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub project_created: bool,
    pub created: usize,
    pub updated: usize,
    /// Remote objects the config does not mention.
    pub warnings: Vec<String>,
}

/// Execute the save command for the config at `config_file`.
pub fn execute<A: AutograderApi>(
    ctx: &AppContext<A>,
    config_file: &Path,
) -> Result<SaveOutcome, AppError> {
    let config = AgConfig::from_path(config_file)?;
    let config_dir = match config_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    save_config(ctx.api(), &config, &config_dir)
}

/// Reconcile `config` against the remote project. Instructor files resolve against `config_dir`.
pub fn save_config<A: AutograderApi>(
    api: &A,
    config: &AgConfig,
    config_dir: &Path,
) -> Result<SaveOutcome, AppError> {
    config.validate()?;

    let mut reconciler = Reconciler {
        api,
        project: &config.project,
        presets: config.presets(),
        config_dir,
        outcome: SaveOutcome::default(),
    };
    reconciler.run()?;
    Ok(reconciler.outcome)
}

/// Descriptions sent with a command. Multi-command commands carry none.
#[derive(Debug, Clone, Copy, Default)]
struct CommandDescriptions<'a> {
    internal_admin_notes: &'a str,
    staff_description: &'a str,
    student_description: &'a str,
    student_on_fail_description: &'a str,
}

struct RemoteIndex {
    student_files: HashMap<String, StudentFile>,
    instructor_files: HashMap<String, InstructorFile>,
    images: HashMap<String, SandboxImage>,
}

struct Reconciler<'a, A: AutograderApi> {
    api: &'a A,
    project: &'a ProjectConfig,
    presets: PresetTable,
    config_dir: &'a Path,
    outcome: SaveOutcome,
}

impl<A: AutograderApi> Reconciler<'_, A> {
    fn run(&mut self) -> Result<(), AppError> {
        let (course, project) = self.sync_project()?;
        let index = RemoteIndex {
            student_files: self.sync_student_files(project.pk)?,
            instructor_files: self.sync_instructor_files(project.pk)?,
            images: self.sandbox_images(&course)?,
        };
        self.sync_test_suites(project.pk, &index)
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.outcome.warnings.push(message);
    }

    fn sync_project(&mut self) -> Result<(Course, Project), AppError> {
        let config = self.project;
        let (course, existing) = resolve_project(self.api, &config.course, &config.name, false)?;
        let project = match existing {
            Some(project) => project,
            None => {
                tracing::info!(project = %config.name, "creating project");
                self.outcome.project_created = true;
                self.outcome.created += 1;
                self.api.create_project(course.pk, &config.name)?
            }
        };

        tracing::info!(project = %config.name, "updating project settings");
        let project = self.api.update_project(project.pk, &settings_body(config)?)?;
        self.outcome.updated += 1;
        Ok((course, project))
    }

    fn sync_student_files(&mut self, project: Pk) -> Result<HashMap<String, StudentFile>, AppError> {
        let mut remote: HashMap<String, StudentFile> = self
            .api
            .list_student_files(project)?
            .into_iter()
            .map(|file| (file.body.pattern.clone(), file))
            .collect();

        let config = self.project;
        let mut wanted = HashSet::new();
        for file in &config.student_files {
            let (min_num_matches, max_num_matches) = file.match_bounds();
            let body = StudentFileBody {
                pattern: file.pattern().to_string(),
                min_num_matches,
                max_num_matches,
            };
            wanted.insert(body.pattern.clone());

            let saved = match remote.get(&body.pattern) {
                Some(existing) => {
                    tracing::info!(pattern = %body.pattern, "updating student file");
                    self.outcome.updated += 1;
                    self.api.update_student_file(existing.pk, &body)?
                }
                None => {
                    tracing::info!(pattern = %body.pattern, "creating student file");
                    self.outcome.created += 1;
                    self.api.create_student_file(project, &body)?
                }
            };
            remote.insert(body.pattern, saved);
        }

        let mut extra: Vec<_> = remote.keys().filter(|p| !wanted.contains(*p)).cloned().collect();
        extra.sort();
        for pattern in extra {
            self.warn(format!(
                "Student file \"{}\" exists remotely but not in the config; leaving it",
                pattern
            ));
        }
        Ok(remote)
    }

    fn sync_instructor_files(
        &mut self,
        project: Pk,
    ) -> Result<HashMap<String, InstructorFile>, AppError> {
        let mut remote: HashMap<String, InstructorFile> = self
            .api
            .list_instructor_files(project)?
            .into_iter()
            .map(|file| (file.name.clone(), file))
            .collect();

        let config = self.project;
        let mut wanted = HashSet::new();
        for file in &config.instructor_files {
            let name = file.name();
            let path = file.resolve(self.config_dir);
            let content = fs::read(&path).map_err(|err| {
                AppError::config_error(format!(
                    "Failed to read instructor file {}: {}",
                    path.display(),
                    err
                ))
            })?;
            let upload = FileUpload { name: name.clone(), content };
            wanted.insert(name.clone());

            let saved = match remote.get(&name) {
                Some(existing) => {
                    tracing::info!(file = %name, "uploading new instructor file content");
                    self.outcome.updated += 1;
                    self.api.update_instructor_file_content(existing.pk, &upload)?
                }
                None => {
                    tracing::info!(file = %name, "creating instructor file");
                    self.outcome.created += 1;
                    self.api.create_instructor_file(project, &upload)?
                }
            };
            remote.insert(name, saved);
        }

        let mut extra: Vec<_> = remote.keys().filter(|n| !wanted.contains(*n)).cloned().collect();
        extra.sort();
        for name in extra {
            self.warn(format!(
                "Instructor file \"{}\" exists remotely but not in the config; leaving it",
                name
            ));
        }
        Ok(remote)
    }

    /// Global images, then course images. Course images shadow global ones of the same name.
    fn sandbox_images(&self, course: &Course) -> Result<HashMap<String, SandboxImage>, AppError> {
        let mut images = HashMap::new();
        for scope in [ImageScope::Global, ImageScope::Course(course.pk)] {
            for image in self.api.list_sandbox_images(scope)? {
                images.insert(image.display_name.clone(), image);
            }
        }
        Ok(images)
    }

    fn sync_test_suites(&mut self, project: Pk, index: &RemoteIndex) -> Result<(), AppError> {
        let config = self.project;
        let remote = self.api.list_test_suites(project)?;
        let mut order = Vec::with_capacity(remote.len());

        for suite in &config.test_suites {
            let body = self.suite_body(suite, index)?;
            let existing = remote.iter().find(|s| s.body.name == suite.name);
            let saved = match existing {
                Some(existing) => {
                    tracing::info!(suite = %suite.name, "updating test suite");
                    self.outcome.updated += 1;
                    let mut saved = self.api.update_test_suite(existing.pk, &body)?;
                    if saved.ag_test_cases.is_empty() {
                        saved.ag_test_cases = existing.ag_test_cases.clone();
                    }
                    saved
                }
                None => {
                    tracing::info!(suite = %suite.name, "creating test suite");
                    self.outcome.created += 1;
                    self.api.create_test_suite(project, &body)?
                }
            };
            order.push(saved.pk);
            self.sync_test_cases(&saved, suite, index)?;
        }

        for suite in &remote {
            if !order.contains(&suite.pk) {
                self.warn(format!(
                    "Test suite \"{}\" exists remotely but not in the config; leaving it last",
                    suite.body.name
                ));
                order.push(suite.pk);
            }
        }

        tracing::info!("ordering test suites");
        self.api.set_test_suite_order(project, &order)
    }

    fn suite_body(&self, suite: &TestSuiteConfig, index: &RemoteIndex) -> Result<TestSuiteBody, AppError> {
        let instructor_files_needed = suite
            .instructor_files_needed
            .iter()
            .map(|name| lookup_instructor_file(index, name, &suite.name))
            .collect::<Result<Vec<_>, _>>()?;
        let student_files_needed = suite
            .student_files_needed
            .iter()
            .map(|pattern| {
                index.student_files.get(pattern).cloned().ok_or_else(|| {
                    AppError::config_error(format!(
                        "Student file \"{}\" needed by suite \"{}\" not found",
                        pattern, suite.name
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let sandbox_docker_image =
            index.images.get(&suite.sandbox_docker_image).cloned().ok_or_else(|| {
                AppError::config_error(format!(
                    "Sandbox image \"{}\" used by suite \"{}\" not found",
                    suite.sandbox_docker_image, suite.name
                ))
            })?;

        Ok(TestSuiteBody {
            name: suite.name.clone(),
            instructor_files_needed,
            read_only_instructor_files: suite.read_only_instructor_files,
            student_files_needed,
            allow_network_access: suite.allow_network_access,
            deferred: suite.deferred,
            sandbox_docker_image: Some(sandbox_docker_image),
            setup_suite_cmd: suite.setup_suite_cmd.clone(),
            setup_suite_cmd_name: suite.setup_suite_cmd_name.clone(),
            reject_submission_if_setup_fails: suite.reject_submission_if_setup_fails,
            normal_fdbk_config: self.presets.suite(&suite.normal_fdbk_config)?,
            ultimate_submission_fdbk_config: self.presets.suite(&suite.ultimate_submission_fdbk_config)?,
            past_limit_submission_fdbk_config: self
                .presets
                .suite(&suite.past_limit_submission_fdbk_config)?,
            staff_viewer_fdbk_config: self.presets.suite(&suite.staff_viewer_fdbk_config)?,
        })
    }

    fn sync_test_cases(
        &mut self,
        remote_suite: &TestSuite,
        suite: &TestSuiteConfig,
        index: &RemoteIndex,
    ) -> Result<(), AppError> {
        for test in suite.expanded_test_cases()? {
            match &test {
                TestCaseConfig::Single(single) => {
                    let case = self.upsert_test_case(remote_suite, single_case_body(single))?;
                    let command = single_as_command(single);
                    let descriptions = CommandDescriptions {
                        internal_admin_notes: &single.internal_admin_notes,
                        staff_description: &single.staff_description,
                        student_description: &single.student_description,
                        student_on_fail_description: &single.student_on_fail_description,
                    };
                    let body = self.command_body(&command, descriptions, index)?;
                    self.upsert_command(&case, body)?;
                }
                TestCaseConfig::Multi(multi) => {
                    let case = self.upsert_test_case(remote_suite, multi_case_body(multi))?;
                    for command in &multi.commands {
                        let body =
                            self.command_body(command, CommandDescriptions::default(), index)?;
                        self.upsert_command(&case, body)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn upsert_test_case(
        &mut self,
        suite: &TestSuite,
        body: TestCaseBody,
    ) -> Result<TestCase, AppError> {
        match suite.ag_test_cases.iter().find(|case| case.body.name == body.name) {
            Some(existing) => {
                tracing::info!(test = %body.name, "updating test case");
                self.outcome.updated += 1;
                let mut saved = self.api.update_test_case(existing.pk, &body)?;
                if saved.ag_test_commands.is_empty() {
                    saved.ag_test_commands = existing.ag_test_commands.clone();
                }
                Ok(saved)
            }
            None => {
                tracing::info!(test = %body.name, "creating test case");
                self.outcome.created += 1;
                self.api.create_test_case(suite.pk, &body)
            }
        }
    }

    fn upsert_command(&mut self, case: &TestCase, body: CommandBody) -> Result<TestCommand, AppError> {
        match case.ag_test_commands.iter().find(|command| command.body.name == body.name) {
            Some(existing) => {
                tracing::debug!(command = %body.name, "updating command");
                self.outcome.updated += 1;
                self.api.update_command(existing.pk, &body)
            }
            None => {
                tracing::debug!(command = %body.name, "creating command");
                self.outcome.created += 1;
                self.api.create_command(case.pk, &body)
            }
        }
    }

    fn command_body(
        &self,
        command: &CommandConfig,
        descriptions: CommandDescriptions<'_>,
        index: &RemoteIndex,
    ) -> Result<CommandBody, AppError> {
        let file = |name: &Option<String>| {
            name.as_deref()
                .map(|name| lookup_instructor_file(index, name, &command.name))
                .transpose()
        };
        let feedback = &command.feedback;

        Ok(CommandBody {
            name: command.name.clone(),
            cmd: command.cmd.clone(),
            internal_admin_notes: descriptions.internal_admin_notes.to_string(),
            staff_description: descriptions.staff_description.to_string(),
            student_description: descriptions.student_description.to_string(),
            student_on_fail_description: descriptions.student_on_fail_description.to_string(),

            stdin_source: command.input.source,
            stdin_text: command.input.text.clone(),
            stdin_instructor_file: file(&command.input.instructor_file)?,

            expected_return_code: command.return_code.expected,
            points_for_correct_return_code: command.return_code.points,
            deduction_for_wrong_return_code: command.return_code.deduction,

            expected_stdout_source: command.stdout.compare_with,
            expected_stdout_text: command.stdout.text.clone(),
            expected_stdout_instructor_file: file(&command.stdout.instructor_file)?,
            points_for_correct_stdout: command.stdout.points,
            deduction_for_wrong_stdout: command.stdout.deduction,

            expected_stderr_source: command.stderr.compare_with,
            expected_stderr_text: command.stderr.text.clone(),
            expected_stderr_instructor_file: file(&command.stderr.instructor_file)?,
            points_for_correct_stderr: command.stderr.points,
            deduction_for_wrong_stderr: command.stderr.deduction,

            ignore_case: command.diff_options.ignore_case,
            ignore_whitespace: command.diff_options.ignore_whitespace,
            ignore_whitespace_changes: command.diff_options.ignore_whitespace_changes,
            ignore_blank_lines: command.diff_options.ignore_blank_lines,

            normal_fdbk_config: self.presets.command(&feedback.normal_fdbk_config)?,
            first_failed_test_normal_fdbk_config: feedback
                .first_failed_test_normal_fdbk_config
                .as_ref()
                .map(|setting| self.presets.command(setting))
                .transpose()?,
            ultimate_submission_fdbk_config: self
                .presets
                .command(&feedback.ultimate_submission_fdbk_config)?,
            past_limit_submission_fdbk_config: self
                .presets
                .command(&feedback.past_limit_submission_fdbk_config)?,
            staff_viewer_fdbk_config: self.presets.command(&feedback.staff_viewer_fdbk_config)?,

            time_limit: command.resources.time_limit,
            use_virtual_memory_limit: command.resources.virtual_memory_limit.is_some(),
            virtual_memory_limit: command.resources.virtual_memory_limit,
            block_process_spawn: command.resources.block_process_spawn,
        })
    }
}

fn lookup_instructor_file(
    index: &RemoteIndex,
    name: &str,
    owner: &str,
) -> Result<InstructorFile, AppError> {
    index.instructor_files.get(name).cloned().ok_or_else(|| {
        AppError::config_error(format!(
            "Instructor file \"{}\" referenced by \"{}\" not found",
            name, owner
        ))
    })
}

/// The complete settings payload. Fields absent from the config revert to their defaults.
fn settings_body(project: &ProjectConfig) -> Result<ProjectSettingsBody, AppError> {
    let settings = &project.settings;
    let (soft_closing_time, closing_time) =
        to_remote_window(settings.deadline.as_ref(), &project.timezone)?;

    Ok(ProjectSettingsBody {
        guests_can_submit: settings.guests_can_submit,
        soft_closing_time,
        closing_time,
        allow_late_days: settings.allow_late_days,
        ultimate_submission_policy: settings.ultimate_submission_policy.as_str().to_string(),
        min_group_size: settings.min_group_size,
        max_group_size: settings.max_group_size,
        submission_limit_per_day: settings.submission_limit_per_day,
        allow_submissions_past_limit: settings.allow_submissions_past_limit,
        groups_combine_daily_submissions: settings.groups_combine_daily_submissions,
        submission_limit_reset_time: time::to_remote_clock_time(&settings.submission_limit_reset_time),
        submission_limit_reset_timezone: time::serialize_timezone(&project.timezone),
        num_bonus_submissions: settings.num_bonus_submissions,
        send_email_on_submission_received: settings.send_email_receipts.on_submission_received(),
        send_email_on_non_deferred_tests_finished: settings.send_email_receipts.on_tests_finished(),
        use_honor_pledge: settings.honor_pledge.is_some(),
        honor_pledge_text: settings.honor_pledge.clone().unwrap_or_default(),
        total_submission_limit: settings.total_submission_limit,
    })
}

fn single_case_body(test: &SingleCommandTestCase) -> TestCaseBody {
    let feedback = TestCaseFeedbackConfig::default();
    TestCaseBody {
        name: test.name.clone(),
        internal_admin_notes: test.internal_admin_notes.clone(),
        staff_description: test.staff_description.clone(),
        student_description: test.student_description.clone(),
        normal_fdbk_config: feedback,
        ultimate_submission_fdbk_config: feedback,
        past_limit_submission_fdbk_config: feedback,
        staff_viewer_fdbk_config: feedback,
    }
}

fn multi_case_body(test: &MultiCommandTestCase) -> TestCaseBody {
    let TestCaseFeedbackSettings {
        normal_fdbk_config,
        ultimate_submission_fdbk_config,
        past_limit_submission_fdbk_config,
        staff_viewer_fdbk_config,
    } = test.feedback;
    TestCaseBody {
        name: test.name.clone(),
        internal_admin_notes: test.internal_admin_notes.clone(),
        staff_description: test.staff_description.clone(),
        student_description: test.student_description.clone(),
        normal_fdbk_config,
        ultimate_submission_fdbk_config,
        past_limit_submission_fdbk_config,
        staff_viewer_fdbk_config,
    }
}

/// A single-command test's command, named like the test and without deductions.
fn single_as_command(test: &SingleCommandTestCase) -> CommandConfig {
    let mut command = CommandConfig::new(&test.name, &test.cmd);
    command.input = test.input.clone();
    command.return_code = ReturnCodeCheckWithDeduction {
        expected: test.return_code.expected,
        points: test.return_code.points,
        deduction: 0,
    };
    command.stdout = OutputCheckWithDeduction {
        compare_with: test.stdout.compare_with,
        text: test.stdout.text.clone(),
        instructor_file: test.stdout.instructor_file.clone(),
        points: test.stdout.points,
        deduction: 0,
    };
    command.stderr = OutputCheckWithDeduction {
        compare_with: test.stderr.compare_with,
        text: test.stderr.text.clone(),
        instructor_file: test.stderr.instructor_file.clone(),
        points: test.stderr.points,
        deduction: 0,
    };
    command.diff_options = test.diff_options.clone();
    command.feedback = test.feedback.clone();
    command.resources = test.resources.clone();
    command
}
