use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::record::RecordKind;

#[derive(Debug, Parser)]
#[command(
    name = "staffmatch",
    about = "Match candidates to projects and projects to candidates"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add structured records from a JSON file
    Add(AddArgs),
    /// Extract records from text, markdown or JSON files with the LLM
    Ingest(IngestArgs),
    /// Delete a record by id
    Delete(RecordRef),
    /// Show a single record
    Get(GetArgs),
    /// List every record of one type
    List(ListArgs),
    /// Search one collection by stack, skills and description
    Search(SearchArgs),
    /// Find counterparts for a record and describe them with the LLM
    Match(MatchArgs),
    /// Re-embed records and rewrite the vector index
    Rebuild(RebuildArgs),
    /// Show collection sizes and index health
    Status(StatusArgs),
    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

/// Accepts canonical names and their synonyms (`kandidate`, `проект`, ...).
fn parse_kind(value: &str) -> Result<RecordKind, String> {
    RecordKind::parse(value).map_err(|e| e.to_string())
}

fn parse_count(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_threshold(value: &str) -> Result<f32, String> {
    let threshold: f32 = value.parse().map_err(|e| format!("{e}"))?;
    if !(-1.0..=1.0).contains(&threshold) {
        return Err("must be within [-1, 1]".to_string());
    }
    Ok(threshold)
}

// -- Add / Ingest --

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// JSON file holding one record object or an array of them
    pub file: PathBuf,

    /// Record type; overrides the "type" field of every record
    #[arg(short = 't', long = "type", value_parser = parse_kind)]
    pub kind: Option<RecordKind>,
}

#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// A .txt, .md or .json file, or a directory of them
    pub path: PathBuf,

    /// Type of the records described by the files
    #[arg(short = 't', long = "type", value_parser = parse_kind)]
    pub kind: RecordKind,
}

// -- Single records --

#[derive(Debug, Parser)]
pub struct RecordRef {
    /// Record type: candidate or project
    #[arg(value_parser = parse_kind)]
    pub kind: RecordKind,

    /// Record id
    pub id: u64,
}

#[derive(Debug, Parser)]
pub struct GetArgs {
    #[command(flatten)]
    pub record: RecordRef,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Record type: candidate or project
    #[arg(value_parser = parse_kind)]
    pub kind: RecordKind,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Search / Match --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Collection to search: candidate or project
    #[arg(value_parser = parse_kind)]
    pub kind: RecordKind,

    /// Technologies to look for
    #[arg(long, default_value = "")]
    pub stack: String,

    /// Skills to look for
    #[arg(long, default_value = "")]
    pub skills: String,

    /// Free-text description to look for
    #[arg(long, default_value = "")]
    pub description: String,

    /// Maximum number of results (defaults to the top_k setting)
    #[arg(short = 'n', long, value_parser = parse_count)]
    pub count: Option<usize>,

    /// Minimum similarity (defaults to the threshold setting)
    #[arg(long, value_parser = parse_threshold, allow_hyphen_values = true)]
    pub threshold: Option<f32>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct MatchArgs {
    #[command(flatten)]
    pub record: RecordRef,

    /// Maximum number of counterparts (defaults to the top_k setting)
    #[arg(short = 'n', long, value_parser = parse_count)]
    pub count: Option<usize>,

    /// Minimum similarity (defaults to the threshold setting)
    #[arg(long, value_parser = parse_threshold, allow_hyphen_values = true)]
    pub threshold: Option<f32>,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Rebuild / Status --

#[derive(Debug, Parser)]
pub struct RebuildArgs {
    /// Rebuild only this collection
    #[arg(value_parser = parse_kind)]
    pub kind: Option<RecordKind>,
}

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Config --

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show the effective settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Persist a setting in config.redb
    Set {
        /// One of: top_k, threshold, embedding_model, llm_model,
        /// llm_base_url, llm_timeout_secs
        key: String,
        value: String,
    },
    /// Remove a stored setting (revert to default)
    Clear { key: String },
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "staffmatch",
            &mut std::io::stdout(),
        );
    }
}
