mod fake_autograder;

pub use fake_autograder::{FakeAutograder, FakeState, default_project_settings};
