use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "ragbert",
    about = "Retrieval-augmented generation over your PDF documents"
)]
pub struct Cli {
    /// Override the vector index cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest PDF documents and answer questions interactively
    Chat(ChatArgs),
    /// Add PDF documents to the vector index
    Ingest(IngestArgs),
    /// Answer a single question against the existing index
    Ask(AskArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Chat --

#[derive(Debug, Parser)]
pub struct ChatArgs {
    /// One or more local paths to PDF documents
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,

    /// Show reference chunks for each answer
    #[arg(long)]
    pub show_references: bool,
}

// -- Ingest --

#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// One or more local paths to PDF documents
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,

    /// Allow adding to an index that already exists
    #[arg(long)]
    pub exist_ok: bool,
}

// -- Ask --

#[derive(Debug, Parser)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// Show reference chunks for the answer
    #[arg(long)]
    pub show_references: bool,

    /// Output the full result as JSON
    #[arg(long)]
    pub json: bool,
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
            "ragbert",
            &mut std::io::stdout(),
        );
    }
}
