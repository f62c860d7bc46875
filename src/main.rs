use std::io::{BufRead, Write};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ragbert::{
    cli::{AskArgs, ChatArgs, Cli, Command, IngestArgs},
    create_vector_db, error, Rag, SearchResult, Settings,
};

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("RAGBERT_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Optional .env file; missing is fine.
    let _ = dotenvy::dotenv();

    let mut settings = Settings::from_env()?;
    if let Some(cache_dir) = cli.cache_dir {
        settings.cache_dir = cache_dir;
    }

    match cli.command {
        Command::Chat(args) => cmd_chat(&settings, &args)?,
        Command::Ingest(args) => cmd_ingest(&settings, &args)?,
        Command::Ask(args) => cmd_ask(&settings, &args)?,
        Command::Completions(args) => args.generate(),
    }

    Ok(())
}

/// Wipe any previous index, ingest the given documents, and answer
/// questions until the user types `exit`.
fn cmd_chat(settings: &Settings, args: &ChatArgs) -> error::Result<()> {
    let _ = std::fs::remove_dir_all(&settings.cache_dir);

    let mut rag = Rag::from_settings(settings, false)?;
    rag.add_pdf_documents(&args.documents, true)?;
    println!("Ingested PDF documents. Please ask your questions.");

    let stdin = std::io::stdin();
    loop {
        print!(">>> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt.eq_ignore_ascii_case("exit") {
            break;
        }

        let result = rag.generate(prompt)?;
        println!("{}", result.text);
        if args.show_references {
            print_references(&result.search_results);
        }
    }

    Ok(())
}

fn cmd_ingest(settings: &Settings, args: &IngestArgs) -> error::Result<()> {
    let mut vector_db = create_vector_db(
        settings.vector_db_type.parse()?,
        &settings.cache_dir,
        args.exist_ok,
        &settings.embed_model,
    )?;
    vector_db.add_pdf_documents(&args.documents, &settings.chunking(), true)?;

    println!(
        "Ingested {} PDF document(s) into {}",
        args.documents.len(),
        settings.cache_dir.display()
    );
    Ok(())
}

fn cmd_ask(settings: &Settings, args: &AskArgs) -> error::Result<()> {
    let mut rag = Rag::from_settings(settings, true)?;
    let result = rag.generate(&args.question)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", result.text);
    if args.show_references {
        print_references(&result.search_results);
    }
    Ok(())
}

fn print_references(results: &[SearchResult]) {
    println!("\nReferences:");
    for reference in results {
        println!();
        println!(
            "{} {}",
            reference.metadata.path,
            reference.metadata.page_label()
        );
        println!("{}", reference.text);
    }
    println!();
}
