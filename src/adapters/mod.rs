pub mod autograder_http;
pub mod embedded_init_template;
pub mod token_file;
