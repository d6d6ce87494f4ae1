#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Command-line helpers for the other side of the relay: building payloads,
//! submitting them and reading the results back.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use glob::{Pattern, glob};
use serde_json::Value;

use crate::{
    error::ErrorBody,
    payload::{GradeResult, IdField, RawPayload, SourceFile, SubmissionPayload},
};

/// Inputs for [`pack`].
#[derive(Debug, Clone)]
pub struct PackArgs {
    /// Student identity
    pub id:           String,
    /// Assignment identifier
    pub task:         Option<String>,
    /// Key to put the identity under
    pub id_field:     IdField,
    /// Assignment description file
    pub read_me:      PathBuf,
    /// Test output file
    pub test_results: PathBuf,
    /// Submitted files, in order
    pub sources:      Vec<PathBuf>,
}

/// Builds a payload from files on disk.
pub fn pack(args: &PackArgs) -> Result<RawPayload> {
    let read_me = fs::read_to_string(&args.read_me)
        .with_context(|| format!("Could not read {}", args.read_me.display()))?;
    let test_results = fs::read_to_string(&args.test_results)
        .with_context(|| format!("Could not read {}", args.test_results.display()))?;
    let source_files = args
        .sources
        .iter()
        .map(|p| SourceFile::from_path(p))
        .collect::<Result<Vec<_>>>()?;

    let payload = SubmissionPayload {
        id: args.id.clone(),
        task: args.task.clone(),
        read_me,
        source_files,
        test_results,
    };

    Ok(payload.to_wire(args.id_field))
}

/// Lists `path` if it is a file, or every `*.json` file inside it, sorted.
pub fn json_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("Path does not exist: {}", path.display());
    }

    let dir = path.to_str().context("Could not convert path to string")?;
    let pattern = format!("{}/*.json", Pattern::escape(dir.trim_end_matches('/')));

    Ok(glob(&pattern)
        .context("Could not create glob")?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect())
}

/// Checks that `part` can be used as (part of) a single file name.
fn file_name_part<'a>(what: &str, part: &'a str) -> Result<&'a str> {
    if part.is_empty() || part == "." || part.contains("..") || part.contains(['/', '\\']) {
        bail!("Refusing to use {what} `{part}` in a file name");
    }
    Ok(part)
}

/// File name a result is saved under: `<student_id>.json`, or
/// `<student_id>-<task>.json` when the result names a task.
pub fn result_file_name(result: &GradeResult) -> Result<String> {
    let id = file_name_part("student id", &result.student_id)?;
    match &result.task {
        Some(task) => Ok(format!("{id}-{}.json", file_name_part("task", task)?)),
        None => Ok(format!("{id}.json")),
    }
}

/// Posts one payload to the relay and decodes the verdict.
pub async fn submit_one(
    client: &reqwest::Client,
    url: &str,
    payload: &Value,
) -> Result<GradeResult> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .with_context(|| format!("Could not reach {url}"))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.detail)
            .unwrap_or(text);
        bail!("Relay answered {status}: {detail}");
    }

    response
        .json::<GradeResult>()
        .await
        .context("Relay answered with an unexpected body")
}

/// Submits every payload under `input` one after another, writing each result
/// to `<output>/` under [`result_file_name`]. Failures are reported and
/// skipped; the call errors at the end if any submission failed. Two results
/// mapping to the same file in one run count as a failure for the second.
pub async fn submit_all(url: &str, input: &Path, output: &Path) -> Result<()> {
    fs::create_dir_all(output)
        .with_context(|| format!("Could not create {}", output.display()))?;

    let client = reqwest::Client::new();
    let files = json_files(input)?;
    let mut failed = Vec::new();
    let mut written = HashSet::new();

    for file in &files {
        let outcome = async {
            let text = fs::read_to_string(file)
                .with_context(|| format!("Could not read {}", file.display()))?;
            let payload: Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            let result = submit_one(&client, url, &payload).await?;

            let name = result_file_name(&result)?;
            if !written.insert(name.clone()) {
                bail!("{name} was already written by an earlier submission");
            }
            let target = output.join(&name);
            fs::write(&target, serde_json::to_string_pretty(&result)?)
                .with_context(|| format!("Could not write {}", target.display()))?;
            Ok::<_, anyhow::Error>(result)
        }
        .await;

        match outcome {
            Ok(result) => {
                tracing::info!(file = %file.display(), student = %result.student_id, status = %result.status, "graded");
            }
            Err(e) => {
                tracing::error!(file = %file.display(), "submission failed: {e:#}");
                failed.push(file.display().to_string());
            }
        }
    }

    if !failed.is_empty() {
        bail!("{} of {} submissions failed: {}", failed.len(), files.len(), failed.join(", "));
    }
    Ok(())
}

/// Renders one result for the terminal.
pub fn render_result(path: &Path, result: &GradeResult) -> String {
    let status = match result.status.as_str() {
        "Pass" => result.status.green().bold(),
        "Fail" => result.status.red().bold(),
        _ => result.status.normal(),
    };

    let mut out = format!("{} {}\n", "File:".blue().bold(), path.display());
    out.push_str(&format!("{} {}\n", "Student ID:".yellow().bold(), result.student_id));
    if let Some(task) = &result.task {
        out.push_str(&format!("{} {}\n", "Task:".yellow().bold(), task));
    }
    out.push_str(&format!("{} {}\n", "Status:".green().bold(), status));
    out.push_str(&format!("{}\n{}", "Feedback:".cyan().bold(), result.feedback.trim()));
    out
}

/// Prints one result file, or every result in a directory.
pub fn print_feedback(path: &Path) -> Result<()> {
    for file in json_files(path)? {
        let text = fs::read_to_string(&file)
            .with_context(|| format!("Could not read {}", file.display()))?;
        let result: GradeResult = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a grade result", file.display()))?;
        println!("{}", render_result(&file, &result));
        println!("{}", "-".repeat(60));
    }
    Ok(())
}
