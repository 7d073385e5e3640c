use crate::ports::AutograderApi;

/// Application context holding dependencies for command execution.
pub struct AppContext<A: AutograderApi> {
    api: A,
}

impl<A: AutograderApi> AppContext<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Get a reference to the grading service client.
    pub fn api(&self) -> &A {
        &self.api
    }
}
