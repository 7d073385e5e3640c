//! agsync: Keep autograder.io projects in sync with a declarative YAML config.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use app::api::{init, load, save};
pub use domain::AppError;
