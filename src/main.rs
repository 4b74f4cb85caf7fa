//! ragline command-line entry point.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use ragline_core::config::Config;
use ragline_core::sample::ingest_samples;
use ragline_core::{DefaultPipeline, QueryAnswer, SourceGroup, SystemInfo, build_pipeline};
use ragline_memory::Metadata;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Retrieval-augmented question answering over your own documents.
#[derive(Parser, Debug)]
#[command(name = "ragline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a single pdf, txt or md file
    IngestFile { path: PathBuf },

    /// Ingest every supported file directly inside a directory
    IngestDir { path: PathBuf },

    /// Ingest raw text
    IngestText {
        text: String,

        /// Label stored as the chunks' source
        #[arg(long, value_name = "LABEL")]
        source: Option<String>,
    },

    /// Ask a question against the ingested documents
    Query {
        question: String,

        /// Maximum number of chunks to retrieve
        #[arg(short = 'k', long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Show collection, embedding model and generator status
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored documents grouped by source
    Documents,

    /// Empty the collection
    Reset {
        /// Ingest the built-in sample texts afterwards
        #[arg(long)]
        sample: bool,
    },

    /// Ingest the built-in sample texts
    Sample,

    /// Start an interactive session
    Interactive,
}

fn resolve_config_path(cli: &Cli) -> PathBuf {
    if let Some(path) = &cli.config {
        return path.clone();
    }
    if let Ok(path) = std::env::var("RAGLINE_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(&cli);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let pipeline = build_pipeline(&config)
        .await
        .context("failed to start the retrieval pipeline")?;

    if let Err(e) = run(cli.command, &pipeline).await {
        eprintln!("Error: {e:#}");
    }
    Ok(())
}

async fn run(command: Command, pipeline: &DefaultPipeline) -> anyhow::Result<()> {
    match command {
        Command::IngestFile { path } => ingest_file(pipeline, &path).await,
        Command::IngestDir { path } => ingest_dir(pipeline, &path).await,
        Command::IngestText { text, source } => {
            let metadata = source.map(|label| {
                let mut meta = Metadata::new();
                meta.insert("source".into(), serde_json::Value::from(label));
                meta
            });
            let count = pipeline.ingest_text(&text, metadata.as_ref()).await?;
            println!("Successfully ingested {count} chunks");
            Ok(())
        }
        Command::Query { question, limit } => query(pipeline, &question, limit).await,
        Command::Info { json } => {
            let info = pipeline.system_info().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print_info(&info);
            }
            Ok(())
        }
        Command::Documents => {
            print_documents(&pipeline.unique_documents().await?);
            Ok(())
        }
        Command::Reset { sample } => {
            pipeline.reset().await?;
            println!("Collection reset");
            if sample {
                ingest_sample(pipeline).await?;
            }
            Ok(())
        }
        Command::Sample => ingest_sample(pipeline).await,
        Command::Interactive => interactive(pipeline).await,
    }
}

async fn ingest_file(pipeline: &DefaultPipeline, path: &Path) -> anyhow::Result<()> {
    println!("Ingesting file: {}", path.display());
    let count = pipeline.ingest_file(path).await?;
    println!("Successfully ingested {count} chunks");
    Ok(())
}

async fn ingest_dir(pipeline: &DefaultPipeline, path: &Path) -> anyhow::Result<()> {
    println!("Ingesting directory: {}", path.display());
    let count = pipeline.ingest_directory(path).await?;
    println!("Successfully ingested {count} chunks");
    Ok(())
}

async fn query(
    pipeline: &DefaultPipeline,
    question: &str,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let answer = pipeline.query(question, limit).await?;
    print_answer(&answer);
    Ok(())
}

async fn ingest_sample(pipeline: &DefaultPipeline) -> anyhow::Result<()> {
    let counts = ingest_samples(pipeline).await?;
    for (source, count) in &counts {
        println!("Ingested {count} chunks from '{source}'");
    }
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    println!("Total chunks ingested: {total}");
    Ok(())
}

fn source_label(metadata: &Metadata) -> &str {
    ["source_file", "source"]
        .iter()
        .find_map(|key| metadata.get(*key).and_then(serde_json::Value::as_str))
        .unwrap_or("Unknown")
}

fn print_answer(answer: &QueryAnswer) {
    println!("\nAnswer: {}", answer.answer);
    if !answer.sources.is_empty() {
        println!("\nSources ({}):", answer.sources.len());
        for (i, source) in answer.sources.iter().enumerate() {
            println!(
                "  {}. {} (distance {:.3})",
                i + 1,
                source_label(&source.metadata),
                source.distance
            );
        }
    }
}

fn print_info(info: &SystemInfo) {
    println!("=== RAG System Information ===");
    println!(
        "Vector DB: {} ({} documents)",
        info.vector_store.name, info.vector_store.document_count
    );
    println!(
        "Storage: {} at {}",
        info.vector_store.connection.backend, info.vector_store.connection.location
    );
    println!(
        "Embedding Model: {} ({} dimensions)",
        info.embedding_model.model_name, info.embedding_model.embedding_dimension
    );
    println!("LLM Provider: {} ({})", info.llm.provider, info.llm.model);
}

fn print_documents(groups: &[SourceGroup]) {
    if groups.is_empty() {
        println!("No documents stored");
        return;
    }
    println!("Documents ({}):", groups.len());
    for group in groups {
        println!("  {} ({} chunks)", group.source, group.total_chunks);
    }
}

enum ReplCommand<'a> {
    Quit,
    Help,
    Info,
    Ingest(&'a str),
    IngestDir(&'a str),
    Query(&'a str),
    Empty,
}

fn parse_repl(line: &str) -> ReplCommand<'_> {
    let line = line.trim();
    match line {
        "" => return ReplCommand::Empty,
        "quit" | "exit" => return ReplCommand::Quit,
        "help" => return ReplCommand::Help,
        "info" => return ReplCommand::Info,
        _ => {}
    }
    if let Some(rest) = line.strip_prefix("ingest-dir ") {
        ReplCommand::IngestDir(rest.trim())
    } else if let Some(rest) = line.strip_prefix("ingest ") {
        ReplCommand::Ingest(rest.trim())
    } else if let Some(rest) = line.strip_prefix("query ") {
        ReplCommand::Query(rest.trim())
    } else {
        ReplCommand::Query(line)
    }
}

const REPL_HELP: &str = "Commands: ingest <file>, ingest-dir <dir>, query <question>, info, quit";

async fn interactive(pipeline: &DefaultPipeline) -> anyhow::Result<()> {
    println!("=== Interactive RAG Mode ===");
    println!("Type 'quit' or 'exit' to stop");
    println!("{REPL_HELP}");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"RAG> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let result = match parse_repl(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Empty => Ok(()),
            ReplCommand::Help => {
                println!("{REPL_HELP}");
                Ok(())
            }
            ReplCommand::Info => pipeline
                .system_info()
                .await
                .map(|info| print_info(&info))
                .map_err(Into::into),
            ReplCommand::Ingest(path) => ingest_file(pipeline, Path::new(path)).await,
            ReplCommand::IngestDir(path) => ingest_dir(pipeline, Path::new(path)).await,
            ReplCommand::Query(question) => query(pipeline, question, None).await,
        };
        if let Err(e) = result {
            println!("Error: {e:#}");
        }
    }

    println!("Goodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_query_with_limit() {
        let cli = Cli::try_parse_from(["ragline", "query", "what is rag?", "--limit", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Query { ref question, limit: Some(3) } if question == "what is rag?"
        ));
    }

    #[test]
    fn cli_global_config_flag() {
        let cli =
            Cli::try_parse_from(["ragline", "info", "--json", "--config", "custom.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("custom.toml")));
        assert!(matches!(cli.command, Command::Info { json: true }));
        assert_eq!(resolve_config_path(&cli), PathBuf::from("custom.toml"));
    }

    #[test]
    fn cli_ingest_text_source() {
        let cli =
            Cli::try_parse_from(["ragline", "ingest-text", "hello", "--source", "Notes"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::IngestText { ref text, source: Some(ref s) } if text == "hello" && s == "Notes"
        ));
    }

    #[test]
    fn cli_requires_command() {
        assert!(Cli::try_parse_from(["ragline"]).is_err());
    }

    #[test]
    fn repl_parsing() {
        assert!(matches!(parse_repl("  quit "), ReplCommand::Quit));
        assert!(matches!(parse_repl("exit"), ReplCommand::Quit));
        assert!(matches!(parse_repl(""), ReplCommand::Empty));
        assert!(matches!(parse_repl("info"), ReplCommand::Info));
        assert!(matches!(parse_repl("ingest a.txt"), ReplCommand::Ingest("a.txt")));
        assert!(matches!(parse_repl("ingest-dir docs/"), ReplCommand::IngestDir("docs/")));
        assert!(matches!(parse_repl("query what?"), ReplCommand::Query("what?")));
        assert!(matches!(parse_repl("what is rag"), ReplCommand::Query("what is rag")));
    }

    #[test]
    fn source_label_prefers_source_file() {
        let mut meta = Metadata::new();
        assert_eq!(source_label(&meta), "Unknown");
        meta.insert("source".into(), serde_json::json!("notes.txt"));
        assert_eq!(source_label(&meta), "notes.txt");
        meta.insert("source_file".into(), serde_json::json!("/docs/notes.txt"));
        assert_eq!(source_label(&meta), "/docs/notes.txt");
    }
}
