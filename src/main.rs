#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # imagi
//!
//! Runs the grading relay, and offers a few helpers for feeding it.
//!
//! Configuration comes from the environment (a `.env` file is read first). At
//! minimum the upstream credential for the selected variant must be set, e.g.
//! `IMAGI_OPENAI_API_KEY` for the default `imagi_gpt` variant.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bpaf::*;
use dotenvy::dotenv;
use imagi::{ServiceConfig, client, payload::IdField, server};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Serve the relay
    Serve,
    /// Build a payload from files
    Pack {
        /// Student identity
        id:           String,
        /// Assignment identifier
        task:         Option<String>,
        /// Identity key in the payload
        id_field:     IdField,
        /// Assignment description file
        read_me:      PathBuf,
        /// Test output file
        test_results: PathBuf,
        /// Where to write the payload; stdout if absent
        output:       Option<PathBuf>,
        /// Submitted files
        sources:      Vec<PathBuf>,
    },
    /// Send payloads to a running relay
    Submit {
        /// Grading endpoint URL
        url:    String,
        /// Payload file or directory
        json:   PathBuf,
        /// Directory results are written to
        output: PathBuf,
    },
    /// Print grade results
    Feedback(PathBuf),
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses a JSON file or directory path
    fn j() -> impl Parser<PathBuf> {
        short('j')
            .long("json")
            .help("JSON file, or a directory of JSON files")
            .argument::<PathBuf>("PATH")
    }

    let serve = pure(Cmd::Serve)
        .to_options()
        .command("serve")
        .help("Serve the grading relay (configured from the environment)");

    let id = long("id")
        .help("Student identity")
        .argument::<String>("ID");
    let task = long("task")
        .help("Assignment identifier")
        .argument::<String>("TASK")
        .optional();
    let id_field = long("id-field")
        .help("Key for the identity: student_id or user_id")
        .argument::<IdField>("FIELD")
        .fallback(IdField::UserId);
    let read_me = long("readme")
        .help("Assignment description file")
        .argument::<PathBuf>("FILE");
    let test_results = long("tests")
        .help("Test output file")
        .argument::<PathBuf>("FILE");
    let output = short('o')
        .long("output")
        .help("Write the payload here instead of stdout")
        .argument::<PathBuf>("FILE")
        .optional();
    let sources = positional::<PathBuf>("SOURCE")
        .help("Submitted source file")
        .many();
    let pack = construct!(Cmd::Pack {
        id,
        task,
        id_field,
        read_me,
        test_results,
        output,
        sources
    })
    .to_options()
    .command("pack")
    .help("Build a grading payload from files on disk");

    let url = short('u')
        .long("url")
        .help("Grading endpoint, e.g. http://127.0.0.1:8000/imagi_gpt")
        .argument::<String>("URL");
    let json = j();
    let output = short('o')
        .long("output")
        .help("Directory grade results are written to")
        .argument::<PathBuf>("DIR");
    let submit = construct!(Cmd::Submit { url, json, output })
        .to_options()
        .command("submit")
        .help("Send payloads to a running relay and save the verdicts");

    let feedback = construct!(Cmd::Feedback(j()))
        .to_options()
        .command("feedback")
        .help("Print grade results");

    let cmd = construct!([serve, pack, submit, feedback]);

    cmd.to_options()
        .descr("Relay student submissions to an LLM for pass/fail feedback")
        .run()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let fmt = fmt::layer().with_target(false);
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("imagi=info"));
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match options() {
        Cmd::Serve => {
            let config = ServiceConfig::from_env().context("Refusing to start")?;
            server::serve(config).await?;
        }
        Cmd::Pack {
            id,
            task,
            id_field,
            read_me,
            test_results,
            output,
            sources,
        } => {
            let payload = client::pack(&client::PackArgs {
                id,
                task,
                id_field,
                read_me,
                test_results,
                sources,
            })?;
            let json = serde_json::to_string_pretty(&payload)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("Could not write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Cmd::Submit { url, json, output } => client::submit_all(&url, &json, &output).await?,
        Cmd::Feedback(path) => client::print_feedback(&path)?,
    };

    Ok(())
}
