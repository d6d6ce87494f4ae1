#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt::Display, path::Path, str::FromStr};

use anyhow::{Context, Result};
use bon::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A single file submitted by a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(on(String, into))]
pub struct SourceFile {
    /// Name of the file as the student submitted it
    pub filename: String,
    /// Full text of the file
    pub content:  String,
}

impl SourceFile {
    /// Reads a file from disk, using its final path component as the filename.
    pub fn from_path(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;

        Ok(Self { filename, content })
    }
}

/// Which request key carries the student's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdField {
    /// `student_id`
    StudentId,
    /// `user_id`
    #[default]
    UserId,
}

impl IdField {
    /// Returns the JSON key name.
    pub fn key(&self) -> &'static str {
        match self {
            IdField::StudentId => "student_id",
            IdField::UserId => "user_id",
        }
    }
}

impl Display for IdField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for IdField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student_id" => Ok(IdField::StudentId),
            "user_id" => Ok(IdField::UserId),
            other => Err(format!("expected `student_id` or `user_id`, got `{other}`")),
        }
    }
}

/// Shape a request body has to satisfy beyond what the JSON extractor checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadSchema {
    /// Key that must carry the student identity
    pub id_field:     IdField,
    /// Whether `task` must be present
    pub require_task: bool,
}

/// Request body as it arrives on the wire.
///
/// Both identity keys are accepted by the extractor; [`PayloadSchema`] decides
/// which one is required.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPayload {
    /// Identity under the `student_id` key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id:   Option<String>,
    /// Identity under the `user_id` key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id:      Option<String>,
    /// Assignment identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task:         Option<String>,
    /// Assignment description
    pub read_me:      String,
    /// Submitted files, in submission order
    pub source_files: Vec<SourceFile>,
    /// Output of the automated test run
    pub test_results: String,
}

/// A missing key that the active [`PayloadSchema`] requires.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("missing field `{0}`")]
pub struct MissingField(pub &'static str);

impl RawPayload {
    /// Checks the body against `schema` and produces a validated payload.
    pub fn validate(self, schema: &PayloadSchema) -> Result<SubmissionPayload, MissingField> {
        let id = match schema.id_field {
            IdField::StudentId => self.student_id,
            IdField::UserId => self.user_id,
        }
        .ok_or(MissingField(schema.id_field.key()))?;

        if schema.require_task && self.task.is_none() {
            return Err(MissingField("task"));
        }

        Ok(SubmissionPayload {
            id,
            task: self.task,
            read_me: self.read_me,
            source_files: self.source_files,
            test_results: self.test_results,
        })
    }
}

/// A validated grading request.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(on(String, into))]
pub struct SubmissionPayload {
    /// Student identity, whichever key it arrived under
    pub id:           String,
    /// Assignment identifier, if the request carried one
    pub task:         Option<String>,
    /// Assignment description
    pub read_me:      String,
    /// Submitted files, in submission order
    #[builder(default)]
    pub source_files: Vec<SourceFile>,
    /// Output of the automated test run
    pub test_results: String,
}

impl SubmissionPayload {
    /// Filenames joined with `, `, in submission order.
    pub fn joined_filenames(&self) -> String {
        self.source_files.iter().map(|f| f.filename.as_str()).join(", ")
    }

    /// File contents separated by a blank line, in submission order.
    pub fn joined_contents(&self) -> String {
        self.source_files.iter().map(|f| f.content.as_str()).join("\n\n")
    }

    /// Serializes this payload using `id_field` as the identity key.
    pub fn to_wire(&self, id_field: IdField) -> RawPayload {
        let (student_id, user_id) = match id_field {
            IdField::StudentId => (Some(self.id.clone()), None),
            IdField::UserId => (None, Some(self.id.clone())),
        };

        RawPayload {
            student_id,
            user_id,
            task: self.task.clone(),
            read_me: self.read_me.clone(),
            source_files: self.source_files.clone(),
            test_results: self.test_results.clone(),
        }
    }
}

/// The verdict returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeResult {
    /// Student identity, always under the `student_id` key
    pub student_id: String,
    /// Assignment identifier, omitted when the request had none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task:       Option<String>,
    /// `Pass` or `Fail`
    pub status:     String,
    /// Feedback text from the model
    pub feedback:   String,
}
