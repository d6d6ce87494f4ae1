#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Prompt templates and the fields substituted into them.

use std::path::Path;

use crate::payload::SubmissionPayload;

/// Fields a template can reference, each as `{name}`.
pub const PLACEHOLDERS: [&str; 4] = ["read_me", "filenames", "contents", "test_results"];

/// Errors raised while loading or rendering a prompt template.
#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("could not read prompt template {path}")]
    Read {
        /// Path that was read
        path:   String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
    /// The template never references one of the request fields.
    #[error("prompt template does not reference `{{{0}}}`")]
    MissingPlaceholder(&'static str),
}

/// Values rendered into a prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptFields<'a> {
    /// Assignment description
    pub read_me:      &'a str,
    /// Filenames joined with `, `
    pub filenames:    &'a str,
    /// File contents joined with a blank line
    pub contents:     &'a str,
    /// Test run output
    pub test_results: &'a str,
}

impl PromptFields<'_> {
    /// Looks up a field by placeholder name.
    fn get(&self, name: &str) -> Option<&str> {
        match name {
            "read_me" => Some(self.read_me),
            "filenames" => Some(self.filenames),
            "contents" => Some(self.contents),
            "test_results" => Some(self.test_results),
            _ => None,
        }
    }
}

/// Something that can turn request fields into a prompt.
pub trait TemplateProvider: Send + Sync {
    /// Renders the prompt for one request.
    fn render(&self, fields: &PromptFields<'_>) -> Result<String, TemplateError>;
}

/// Embedded template asking for expert feedback aimed at the teacher's review.
pub const TEACHER_TEMPLATE: &str = include_str!("templates/teacher.md");
/// Embedded template written to address the student directly.
pub const STUDENT_TEMPLATE: &str = include_str!("templates/student.md");

/// A text template with `{read_me}`, `{filenames}`, `{contents}` and
/// `{test_results}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Raw template text
    source: String,
}

impl PromptTemplate {
    /// Wraps template text, checking that every field is referenced.
    pub fn new(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        for name in PLACEHOLDERS {
            if !source.contains(&format!("{{{name}}}")) {
                return Err(TemplateError::MissingPlaceholder(name));
            }
        }
        Ok(Self { source })
    }

    /// Reads a template from disk.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::new(source)
    }
}

impl TemplateProvider for PromptTemplate {
    /// Substitutes fields in a single pass, so placeholder-like text inside
    /// student code is never expanded. Unknown `{...}` sequences are kept as is.
    fn render(&self, fields: &PromptFields<'_>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(
            self.source.len()
                + fields.read_me.len()
                + fields.filenames.len()
                + fields.contents.len()
                + fields.test_results.len(),
        );
        let mut rest = self.source.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}').and_then(|close| {
                fields
                    .get(&after[..close])
                    .map(|value| (value, close))
            }) {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);

        Ok(out)
    }
}

/// Renders the prompt for `payload` through `provider`.
pub fn render_for(
    provider: &dyn TemplateProvider,
    payload: &SubmissionPayload,
) -> Result<String, TemplateError> {
    let filenames = payload.joined_filenames();
    let contents = payload.joined_contents();

    provider.render(&PromptFields {
        read_me:      &payload.read_me,
        filenames:    &filenames,
        contents:     &contents,
        test_results: &payload.test_results,
    })
}
