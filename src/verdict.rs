#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Turns the model's free-text reply into a structured verdict.
//!
//! The model is asked to answer with a line like `Pass AI Feedback: <text>`.
//! Everything before the first `:` has to name a known [`Status`]; anything
//! else is treated as a broken reply rather than guessed at.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Label the prompt asks the model to put between the status and the colon.
const FEEDBACK_LABEL: &str = "ai feedback";

/// The verdict the model can give.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Submission is acceptable
    Pass,
    /// Submission needs more work
    Fail,
}

impl Status {
    /// Returns the canonical spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "Pass",
            Status::Fail => "Fail",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ReplyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pass" => Ok(Status::Pass),
            "fail" => Ok(Status::Fail),
            _ => Err(ReplyError::UnknownStatus(s.to_string())),
        }
    }
}

/// Ways a reply can break the expected `status: feedback` shape.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ReplyError {
    /// The upstream returned no text at all.
    #[error("upstream reply was empty")]
    Empty,
    /// No `:` separates status and feedback.
    #[error("upstream reply has no `:` separator")]
    MissingSeparator,
    /// The text before the separator is not a known status.
    #[error("upstream reply starts with an unknown status: `{0}`")]
    UnknownStatus(String),
}

/// A parsed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Pass or fail
    pub status:   Status,
    /// Everything after the first `:`
    pub feedback: String,
}

/// Parses `reply` into a [`Verdict`].
///
/// With `trim_feedback` unset the feedback is returned exactly as it follows
/// the colon, surrounding whitespace included.
pub fn parse_reply(reply: Option<&str>, trim_feedback: bool) -> Result<Verdict, ReplyError> {
    let reply = reply.unwrap_or_default();
    if reply.trim().is_empty() {
        return Err(ReplyError::Empty);
    }

    let (head, feedback) = reply.split_once(':').ok_or(ReplyError::MissingSeparator)?;
    let status = parse_status(head)?;
    let feedback = if trim_feedback {
        feedback.trim().to_string()
    } else {
        feedback.to_string()
    };

    Ok(Verdict { status, feedback })
}

/// Reads the status out of the text before the first colon.
///
/// Accepts `Pass`, `**Fail**`, `Pass AI Feedback`, `Fail\nAI Feedback` and the
/// like, in any case.
fn parse_status(head: &str) -> Result<Status, ReplyError> {
    let cleaned = head.replace('*', "");
    let mut words = cleaned.split_whitespace();
    let first = words
        .next()
        .ok_or_else(|| ReplyError::UnknownStatus(head.trim().to_string()))?;
    let status = first
        .parse::<Status>()
        .map_err(|_| ReplyError::UnknownStatus(head.trim().to_string()))?;

    let rest = words.collect::<Vec<_>>().join(" ").to_ascii_lowercase();
    if rest.is_empty() || rest == FEEDBACK_LABEL {
        Ok(status)
    } else {
        Err(ReplyError::UnknownStatus(head.trim().to_string()))
    }
}
