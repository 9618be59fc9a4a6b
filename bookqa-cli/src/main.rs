//! `bookqa`: grounded, citation-backed answers to questions about a public-domain book.
//!
//! ```bash
//! bookqa chunk iliad --input iliad_clean.txt
//! bookqa index iliad
//! bookqa ask iliad "Who killed Patroclus?"
//! bookqa status iliad
//! ```

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use bq_ai::embeddings::ollama_embed::OllamaEmbedder;
use bq_ai::ollama::OllamaClient;
use bq_ai::pipeline::AskOptions;
use bq_core::books::BookId;
use bq_core::chunking::ChunkingParams;
use bq_core::error::AppError;
use clap::{Parser, Subcommand};
use serde::Serialize;

use config::{Config, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "bookqa", version, about = "Ask questions about a book and get quoted, cited answers")]
struct Cli {
    /// JSON config file. Missing means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Overrides `data_dir` from the config.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a cleaned book text into overlapping chunks.
    Chunk {
        book: String,
        /// Cleaned plain text with paragraphs separated by blank lines.
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        target_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Embed stored chunks and write the vector index.
    Index {
        book: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        /// Leave chunk text out of the metadata table.
        #[arg(long)]
        no_embed_text: bool,
    },
    /// Answer a question from the indexed book.
    Ask {
        book: String,
        question: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        max_quotes: Option<usize>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Show chunk and index state for a book.
    Status { book: String },
    /// Check that Ollama is reachable.
    Health {
        #[arg(long)]
        base_url: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn print_result<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<(), AppError> {
    if json {
        let out = serde_json::to_string_pretty(value).map_err(|e| {
            AppError::new("OUTPUT_FAILED", "Failed to encode output").with_details(e.to_string())
        })?;
        println!("{out}");
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

fn embedder(cfg: &Config, base_url: Option<String>) -> Result<OllamaEmbedder, AppError> {
    let base_url = base_url.unwrap_or_else(|| cfg.ollama.base_url.clone());
    Ok(OllamaEmbedder::new(OllamaClient::new(&base_url)?))
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut cfg = Config::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        cfg.data_dir = dir;
    }

    match cli.command {
        Commands::Chunk {
            book,
            input,
            target_size,
            overlap,
        } => {
            let book = BookId::parse(&book)?;
            let params = ChunkingParams {
                target_size: target_size.unwrap_or(cfg.chunking.target_size),
                overlap: overlap.unwrap_or(cfg.chunking.overlap),
            };
            let summary = commands::chunk_book(&cfg, book, &input, params)?;
            print_result(cli.json, &summary, |s| {
                format!(
                    "{} paragraphs -> {} chunks for {} ({})",
                    s.paragraphs, s.chunks, s.book, s.path
                )
            })
        }
        Commands::Index {
            book,
            model,
            base_url,
            no_embed_text,
        } => {
            let book = BookId::parse(&book)?;
            let model = model.unwrap_or_else(|| cfg.ollama.model.clone());
            let embedder = embedder(&cfg, base_url)?;
            let status = commands::build_index(&cfg, book, &embedder, &model, !no_embed_text)?;
            print_result(cli.json, &status, |s| {
                format!(
                    "index ready: {} vectors, dims={}, model={}",
                    s.chunk_count,
                    s.dims.unwrap_or(0),
                    s.model.as_deref().unwrap_or("-")
                )
            })
        }
        Commands::Ask {
            book,
            question,
            top_k,
            max_quotes,
            model,
            base_url,
        } => {
            let book = BookId::parse(&book)?;
            let kb = commands::load_knowledge_base(&cfg, book)?;
            let model = commands::resolve_query_model(&kb, model.as_deref(), &cfg.ollama.model)?;
            let embedder = embedder(&cfg, base_url)?;
            let opts = AskOptions {
                top_k: top_k.unwrap_or(cfg.retrieval.top_k),
                max_quotes: max_quotes.unwrap_or(cfg.quotes.max_quotes),
                model,
                scoring: cfg.quotes.scoring.clone(),
            };
            let outcome = commands::ask(&kb, &embedder, &question, &opts)?;
            print_result(cli.json, &outcome, commands::render_outcome)
        }
        Commands::Status { book } => {
            let book = BookId::parse(&book)?;
            let status = commands::book_status(&cfg, book)?;
            print_result(cli.json, &status, |s| {
                let chunks = s
                    .chunks_stored
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "none".to_string());
                format!(
                    "{} ({}): chunks={}, index ready={}, vectors={}, updated_at={}",
                    s.title,
                    s.book,
                    chunks,
                    s.index.ready,
                    s.index.chunk_count,
                    s.index.updated_at.as_deref().unwrap_or("-")
                )
            })
        }
        Commands::Health { base_url } => {
            let base_url = base_url.unwrap_or_else(|| cfg.ollama.base_url.clone());
            let health = commands::ai_health_check(&base_url)?;
            print_result(cli.json, &health, |h| h.message.clone())
        }
    }
}
