//! # imagi
//!
//! A grading relay. It takes a student's submission (assignment description,
//! source files and test output), asks a large language model for a verdict,
//! and answers with a structured `Pass`/`Fail` plus short feedback.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Payload building, submission and result printing for the CLI
pub mod client;
/// Service configuration read from the environment
pub mod config;
/// Error kinds and their HTTP mapping
pub mod error;
/// The relay service itself
pub mod grader;
/// Request and response shapes
pub mod payload;
/// Prompt templates
pub mod prompt;
/// HTTP router and server loop
pub mod server;
/// Text-generation API clients
pub mod upstream;
/// Reply parsing
pub mod verdict;

pub use config::ServiceConfig;
pub use error::GradeError;
pub use grader::Grader;
pub use payload::{GradeResult, SourceFile, SubmissionPayload};
