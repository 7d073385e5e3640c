//! Export a remote project into a config document.

use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;

use super::lookup::resolve_project;
use crate::app::AppContext;
use crate::domain::config::{
    CommandFeedbackSettings, DiffOptions, OutputCheck, OutputCheckWithDeduction, ResourceLimits,
    ReturnCodeCheck, ReturnCodeCheckWithDeduction, StdinSettings, TestCaseFeedbackConfig,
    TestCaseFeedbackSettings, command_setting_for, from_remote_window, suite_setting_for,
};
use crate::domain::time;
use crate::domain::{
    AgConfig, AppError, CommandConfig, CourseSelection, CutoffPreference, EmailReceipts,
    ExpectedStudentFile, InstructorFileConfig, MultiCommandTestCase, ProjectConfig,
    ProjectSettings, Semester, SingleCommandTestCase, TestCaseConfig, TestSuiteConfig,
    UltimateSubmissionPolicy,
};
use crate::ports::AutograderApi;
use crate::ports::resources::{CommandBody, Course, ProjectSettingsBody, TestCase, TestSuite};

/// Policy name the service used before `best`.
const LEGACY_BEST_POLICY: &str = "best_basic_score";

#[derive(Debug, Clone)]
pub struct LoadOptions<'a> {
    pub course: CourseSelection,
    pub project_name: &'a str,
    pub output_file: &'a Path,
    pub cutoff: CutoffPreference,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub config_path: PathBuf,
    pub instructor_files: Vec<PathBuf>,
    pub test_suites: usize,
}

/// Execute the load command.
///
/// Writes the config document and one file per instructor file next to it.
pub fn execute<A: AutograderApi>(
    ctx: &AppContext<A>,
    options: &LoadOptions<'_>,
) -> Result<LoadOutcome, AppError> {
    let api = ctx.api();
    let (course, project) = resolve_project(api, &options.course, options.project_name, true)?;
    let project = project.ok_or_else(|| {
        AppError::NotFound(format!("Project \"{}\" not found", options.project_name))
    })?;
    tracing::info!(project = %project.name, pk = project.pk, "loading project");

    let output_dir = match options.output_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&output_dir)?;

    let timezone = time::validate_timezone(&project.settings.submission_limit_reset_timezone)?;
    let mut config = AgConfig::new(ProjectConfig {
        name: project.name.clone(),
        timezone,
        course: course_selection(&course)?,
        settings: settings_from_remote(&project.settings, &timezone, options.cutoff)?,
        student_files: Vec::new(),
        instructor_files: Vec::new(),
        test_suites: Vec::new(),
    });

    config.project.student_files = api
        .list_student_files(project.pk)?
        .iter()
        .map(|file| {
            let body = &file.body;
            ExpectedStudentFile::from_remote(&body.pattern, body.min_num_matches, body.max_num_matches)
        })
        .collect();

    let mut written = Vec::new();
    for file in api.list_instructor_files(project.pk)? {
        check_local_file_name(&file.name)?;
        let content = api.download_instructor_file(file.pk)?;
        let path = output_dir.join(&file.name);
        tracing::info!(file = %file.name, "downloaded instructor file");
        fs::write(&path, content)?;
        written.push(path);
        config.project.instructor_files.push(InstructorFileConfig::new(&file.name));
    }

    config.project.test_suites =
        api.list_test_suites(project.pk)?.iter().map(suite_from_remote).collect();

    config.write_to(options.output_file)?;
    Ok(LoadOutcome {
        config_path: options.output_file.to_path_buf(),
        instructor_files: written,
        test_suites: config.project.test_suites.len(),
    })
}

/// Instructor files are written next to the config, so a name must not leave that directory.
fn check_local_file_name(name: &str) -> Result<(), AppError> {
    match Path::new(name).file_name() {
        Some(base) if base == name => Ok(()),
        _ => Err(AppError::InvalidResponse {
            url: "instructor files".to_string(),
            details: format!("instructor file name \"{}\" is not a plain file name", name),
        }),
    }
}

fn course_selection(course: &Course) -> Result<CourseSelection, AppError> {
    let semester = course.semester.as_deref().map(str::parse::<Semester>).transpose()?;
    Ok(CourseSelection { name: course.name.clone(), semester, year: course.year })
}

fn settings_from_remote(
    body: &ProjectSettingsBody,
    timezone: &Tz,
    cutoff: CutoffPreference,
) -> Result<ProjectSettings, AppError> {
    let ultimate_submission_policy = match body.ultimate_submission_policy.as_str() {
        "most_recent" => UltimateSubmissionPolicy::MostRecent,
        "best" => UltimateSubmissionPolicy::Best,
        LEGACY_BEST_POLICY => {
            tracing::warn!(
                "The final graded submission policy \"{}\" is deprecated. Loading it as \"best\".",
                LEGACY_BEST_POLICY
            );
            UltimateSubmissionPolicy::Best
        }
        other => {
            return Err(AppError::InvalidResponse {
                url: "project settings".to_string(),
                details: format!("unknown ultimate_submission_policy \"{}\"", other),
            });
        }
    };

    Ok(ProjectSettings {
        guests_can_submit: body.guests_can_submit,
        deadline: from_remote_window(
            body.soft_closing_time.as_deref(),
            body.closing_time.as_deref(),
            timezone,
            cutoff,
        )?,
        allow_late_days: body.allow_late_days,
        ultimate_submission_policy,
        min_group_size: body.min_group_size,
        max_group_size: body.max_group_size,
        submission_limit_per_day: body.submission_limit_per_day,
        allow_submissions_past_limit: body.allow_submissions_past_limit,
        groups_combine_daily_submissions: body.groups_combine_daily_submissions,
        submission_limit_reset_time: time::parse_clock_time(&body.submission_limit_reset_time)?,
        num_bonus_submissions: body.num_bonus_submissions,
        send_email_receipts: EmailReceipts::from_flags(
            body.send_email_on_submission_received,
            body.send_email_on_non_deferred_tests_finished,
        ),
        honor_pledge: body.use_honor_pledge.then(|| body.honor_pledge_text.clone()),
        total_submission_limit: body.total_submission_limit,
    })
}

fn suite_from_remote(suite: &TestSuite) -> TestSuiteConfig {
    let body = &suite.body;
    let mut config = TestSuiteConfig::new(&body.name);
    config.instructor_files_needed =
        body.instructor_files_needed.iter().map(|file| file.name.clone()).collect();
    config.read_only_instructor_files = body.read_only_instructor_files;
    config.student_files_needed =
        body.student_files_needed.iter().map(|file| file.body.pattern.clone()).collect();
    config.allow_network_access = body.allow_network_access;
    config.deferred = body.deferred;
    if let Some(image) = &body.sandbox_docker_image {
        config.sandbox_docker_image = image.display_name.clone();
    }
    config.setup_suite_cmd = body.setup_suite_cmd.clone();
    config.setup_suite_cmd_name = body.setup_suite_cmd_name.clone();
    config.reject_submission_if_setup_fails = body.reject_submission_if_setup_fails;
    config.normal_fdbk_config = suite_setting_for(body.normal_fdbk_config);
    config.ultimate_submission_fdbk_config = suite_setting_for(body.ultimate_submission_fdbk_config);
    config.past_limit_submission_fdbk_config =
        suite_setting_for(body.past_limit_submission_fdbk_config);
    config.staff_viewer_fdbk_config = suite_setting_for(body.staff_viewer_fdbk_config);
    config.test_cases = suite.ag_test_cases.iter().map(test_case_from_remote).collect();
    config
}

fn test_case_from_remote(case: &TestCase) -> TestCaseConfig {
    if let Some(command) = single_command(case) {
        let mut test = SingleCommandTestCase::new(&case.body.name, &command.cmd);
        test.internal_admin_notes = case.body.internal_admin_notes.clone();
        test.staff_description = case.body.staff_description.clone();
        test.student_description = case.body.student_description.clone();
        test.student_on_fail_description = command.student_on_fail_description.clone();
        test.input = stdin_from_remote(command);
        test.return_code = ReturnCodeCheck {
            expected: command.expected_return_code,
            points: command.points_for_correct_return_code,
        };
        test.stdout = OutputCheck {
            compare_with: command.expected_stdout_source,
            text: command.expected_stdout_text.clone(),
            instructor_file: command.expected_stdout_instructor_file.as_ref().map(|f| f.name.clone()),
            points: command.points_for_correct_stdout,
        };
        test.stderr = OutputCheck {
            compare_with: command.expected_stderr_source,
            text: command.expected_stderr_text.clone(),
            instructor_file: command.expected_stderr_instructor_file.as_ref().map(|f| f.name.clone()),
            points: command.points_for_correct_stderr,
        };
        test.diff_options = diff_options_from_remote(command);
        test.feedback = feedback_from_remote(command);
        test.resources = resources_from_remote(command);
        return TestCaseConfig::Single(test);
    }

    let commands = case.ag_test_commands.iter().map(|command| command_from_remote(&command.body));
    let mut test = MultiCommandTestCase::new(&case.body.name, commands.collect());
    test.internal_admin_notes = case.body.internal_admin_notes.clone();
    test.staff_description = case.body.staff_description.clone();
    test.student_description = case.body.student_description.clone();
    test.feedback = TestCaseFeedbackSettings {
        normal_fdbk_config: case.body.normal_fdbk_config,
        ultimate_submission_fdbk_config: case.body.ultimate_submission_fdbk_config,
        past_limit_submission_fdbk_config: case.body.past_limit_submission_fdbk_config,
        staff_viewer_fdbk_config: case.body.staff_viewer_fdbk_config,
    };
    TestCaseConfig::Multi(test)
}

/// The case's only command, when the case is fully expressible as a single-command test.
fn single_command(case: &TestCase) -> Option<&CommandBody> {
    let [command] = case.ag_test_commands.as_slice() else {
        return None;
    };
    let command = &command.body;
    let body = &case.body;
    let default_feedback = TestCaseFeedbackConfig::default();

    let expressible = command.name == body.name
        && [
            body.normal_fdbk_config,
            body.ultimate_submission_fdbk_config,
            body.past_limit_submission_fdbk_config,
            body.staff_viewer_fdbk_config,
        ]
        .iter()
        .all(|config| *config == default_feedback)
        && command.deduction_for_wrong_return_code == 0
        && command.deduction_for_wrong_stdout == 0
        && command.deduction_for_wrong_stderr == 0
        && command.internal_admin_notes == body.internal_admin_notes
        && command.staff_description == body.staff_description
        && command.student_description == body.student_description;
    expressible.then_some(command)
}

fn command_from_remote(command: &CommandBody) -> CommandConfig {
    let mut config = CommandConfig::new(&command.name, &command.cmd);
    config.input = stdin_from_remote(command);
    config.return_code = ReturnCodeCheckWithDeduction {
        expected: command.expected_return_code,
        points: command.points_for_correct_return_code,
        deduction: command.deduction_for_wrong_return_code,
    };
    config.stdout = OutputCheckWithDeduction {
        compare_with: command.expected_stdout_source,
        text: command.expected_stdout_text.clone(),
        instructor_file: command.expected_stdout_instructor_file.as_ref().map(|f| f.name.clone()),
        points: command.points_for_correct_stdout,
        deduction: command.deduction_for_wrong_stdout,
    };
    config.stderr = OutputCheckWithDeduction {
        compare_with: command.expected_stderr_source,
        text: command.expected_stderr_text.clone(),
        instructor_file: command.expected_stderr_instructor_file.as_ref().map(|f| f.name.clone()),
        points: command.points_for_correct_stderr,
        deduction: command.deduction_for_wrong_stderr,
    };
    config.diff_options = diff_options_from_remote(command);
    config.feedback = feedback_from_remote(command);
    config.resources = resources_from_remote(command);
    config
}

fn stdin_from_remote(command: &CommandBody) -> StdinSettings {
    StdinSettings {
        source: command.stdin_source,
        text: command.stdin_text.clone(),
        instructor_file: command.stdin_instructor_file.as_ref().map(|f| f.name.clone()),
    }
}

fn diff_options_from_remote(command: &CommandBody) -> DiffOptions {
    DiffOptions {
        ignore_case: command.ignore_case,
        ignore_whitespace: command.ignore_whitespace,
        ignore_whitespace_changes: command.ignore_whitespace_changes,
        ignore_blank_lines: command.ignore_blank_lines,
    }
}

fn feedback_from_remote(command: &CommandBody) -> CommandFeedbackSettings {
    CommandFeedbackSettings {
        normal_fdbk_config: command_setting_for(command.normal_fdbk_config),
        first_failed_test_normal_fdbk_config: command
            .first_failed_test_normal_fdbk_config
            .map(command_setting_for),
        ultimate_submission_fdbk_config: command_setting_for(command.ultimate_submission_fdbk_config),
        past_limit_submission_fdbk_config: command_setting_for(
            command.past_limit_submission_fdbk_config,
        ),
        staff_viewer_fdbk_config: command_setting_for(command.staff_viewer_fdbk_config),
    }
}

fn resources_from_remote(command: &CommandBody) -> ResourceLimits {
    ResourceLimits {
        time_limit: command.time_limit,
        virtual_memory_limit: command
            .virtual_memory_limit
            .filter(|_| command.use_virtual_memory_limit),
        block_process_spawn: command.block_process_spawn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::commands::save::save_config;
    use crate::domain::Deadline;
    use crate::testing::{FakeAutograder, default_project_settings};
    use chrono::{NaiveDate, TimeDelta};
    use tempfile::TempDir;

    const CONFIG: &str = r#"
project:
  name: Project 1
  timezone: America/Detroit
  course:
    name: EECS 280
    semester: Fall
    year: 2024
  settings:
    deadline:
      cutoff_type: fixed
      deadline: Jan 15, 2024 11:59PM
      cutoff: Jan 16, 2024 11:59PM
    final_graded_submission_policy: best
    max_group_size: 3
    submission_limit_per_day: 3
    send_email_receipts: on_finish
    honor_pledge: I promise
  student_files:
    - hello.py
    - pattern: test_*.py
      min_num_matches: 0
      max_num_matches: 3
  instructor_files:
    - local_path: instructor_file.txt
  test_suites:
    - name: Suite 1
      instructor_files_needed: [instructor_file.txt]
      student_files_needed: [hello.py]
      test_cases:
        - name: Test 1
          cmd: python3 hello.py
          student_description: Says hello
          student_on_fail_description: Check your greeting
          input:
            source: text
            text: "world\n"
          return_code:
            expected: zero
            points: 1
          feedback:
            normal_fdbk_config: pass/fail+diff
        - name: Test multi
          type: multi_cmd
          commands:
            - name: build
              cmd: make
              return_code:
                expected: zero
                deduction: -2
            - name: run
              cmd: ./main
              stdout:
                compare_with: instructor_file
                instructor_file: instructor_file.txt
                points: 3
              resources:
                virtual_memory_limit: 500000000
    - name: Suite 2
      deferred: true
      setup_suite_cmd: make setup
"#;

    fn saved_project() -> (TempDir, AgConfig, FakeAutograder) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("instructor_file.txt"), "expected\n").unwrap();
        let config = AgConfig::parse_str(CONFIG).unwrap();
        let fake = FakeAutograder::with_course("EECS 280", Semester::Fall, 2024);
        save_config(&fake, &config, dir.path()).unwrap();
        (dir, config, fake)
    }

    fn load_into(
        fake: FakeAutograder,
        output_file: &Path,
        cutoff: CutoffPreference,
    ) -> Result<(LoadOutcome, AgConfig), AppError> {
        let options = LoadOptions {
            course: CourseSelection {
                name: "EECS 280".into(),
                semester: Some(Semester::Fall),
                year: Some(2024),
            },
            project_name: "Project 1",
            output_file,
            cutoff,
        };
        let outcome = execute(&AppContext::new(fake), &options)?;
        let loaded = AgConfig::from_path(output_file)?;
        Ok((outcome, loaded))
    }

    #[test]
    fn saved_config_loads_back_unchanged() {
        let (_dir, config, fake) = saved_project();
        let out = TempDir::new().unwrap();
        let output_file = out.path().join("export").join("ag_project.yml");

        let (outcome, loaded) = load_into(fake, &output_file, CutoffPreference::Fixed).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(outcome.test_suites, 2);
        assert_eq!(outcome.instructor_files, vec![out.path().join("export").join("instructor_file.txt")]);
        assert_eq!(fs::read_to_string(&outcome.instructor_files[0]).unwrap(), "expected\n");
    }

    #[test]
    fn relative_preference_writes_an_offset() {
        let (_dir, config, fake) = saved_project();
        let out = TempDir::new().unwrap();

        let (_, loaded) =
            load_into(fake, &out.path().join("p1.yml"), CutoffPreference::Relative).unwrap();

        let deadline = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(23, 59, 0).unwrap();
        assert_eq!(
            loaded.project.settings.deadline,
            Some(Deadline::Relative { deadline, cutoff: TimeDelta::days(1) })
        );
        assert_eq!(loaded.project.test_suites, config.project.test_suites);
    }

    #[test]
    fn instructor_file_names_cannot_leave_the_export_directory() {
        for name in ["../escaped.txt", "/tmp/escaped.txt", "nested/escaped.txt"] {
            let (_dir, _, fake) = saved_project();
            fake.update_state(|state| state.instructor_files[0].1.name = name.to_string());
            let out = TempDir::new().unwrap();
            let output_file = out.path().join("export").join("ag_project.yml");

            let err = load_into(fake, &output_file, CutoffPreference::Fixed).unwrap_err();

            assert!(matches!(err, AppError::InvalidResponse { .. }), "{} should be rejected", name);
            assert!(!out.path().join("escaped.txt").exists());
            assert!(!output_file.exists());
        }
    }

    #[test]
    fn missing_project_is_not_found() {
        let fake = FakeAutograder::with_course("EECS 280", Semester::Fall, 2024);
        let out = TempDir::new().unwrap();
        let output_file = out.path().join("p1.yml");

        let err = load_into(fake, &output_file, CutoffPreference::Fixed).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(!output_file.exists());
    }

    #[test]
    fn legacy_best_policy_loads_as_best() {
        let body = ProjectSettingsBody {
            ultimate_submission_policy: LEGACY_BEST_POLICY.to_string(),
            ..default_project_settings()
        };
        let settings = settings_from_remote(&body, &Tz::UTC, CutoffPreference::Fixed).unwrap();
        assert_eq!(settings.ultimate_submission_policy, UltimateSubmissionPolicy::Best);
    }

    #[test]
    fn unknown_policy_is_an_invalid_response() {
        let body = ProjectSettingsBody {
            ultimate_submission_policy: "random".to_string(),
            ..default_project_settings()
        };
        let err = settings_from_remote(&body, &Tz::UTC, CutoffPreference::Fixed).unwrap_err();
        assert!(matches!(err, AppError::InvalidResponse { .. }));
    }

    #[test]
    fn honor_pledge_text_is_dropped_when_disabled() {
        let body = ProjectSettingsBody {
            honor_pledge_text: "stale".to_string(),
            ..default_project_settings()
        };
        let settings = settings_from_remote(&body, &Tz::UTC, CutoffPreference::Fixed).unwrap();
        assert_eq!(settings.honor_pledge, None);
    }

    #[test]
    fn case_with_deductions_stays_multi_command() {
        let (_dir, _, fake) = saved_project();
        fake.update_state(|state| {
            let case = &mut state.suites[0].1.ag_test_cases[0];
            case.ag_test_commands[0].body.deduction_for_wrong_stdout = -1;
        });

        let suites = fake.list_test_suites(fake.snapshot().projects[0].1.pk).unwrap();
        let TestCaseConfig::Multi(test) = test_case_from_remote(&suites[0].ag_test_cases[0]) else {
            panic!("expected a multi-command test");
        };
        assert_eq!(test.commands.len(), 1);
        assert_eq!(test.commands[0].stdout.deduction, -1);
    }

    #[test]
    fn memory_limit_is_ignored_when_unused() {
        let (_dir, _, fake) = saved_project();
        fake.update_state(|state| {
            let case = &mut state.suites[0].1.ag_test_cases[1];
            case.ag_test_commands[1].body.use_virtual_memory_limit = false;
        });

        let suites = fake.list_test_suites(fake.snapshot().projects[0].1.pk).unwrap();
        let TestCaseConfig::Multi(test) = test_case_from_remote(&suites[0].ag_test_cases[1]) else {
            panic!("expected a multi-command test");
        };
        assert_eq!(test.commands[1].resources.virtual_memory_limit, None);
    }
}
