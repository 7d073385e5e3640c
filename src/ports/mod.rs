mod autograder_api;
pub mod resources;

pub use autograder_api::{AutograderApi, FileUpload, ImageScope};
pub use resources::Pk;
