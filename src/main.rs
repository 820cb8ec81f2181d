//! Clinical RAG CLI
//!
//! The thin driver standing in for the upstream serving layer: index a
//! protocol, ask questions against it, run the benchmark, test the LLM
//! connection.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clinical_rag::eval::{Benchmark, BenchmarkConfig, GoldDataset, create_sample_dataset};
use clinical_rag::llm::LlmClient;
use clinical_rag::{Config, Document, RagEngine};
use std::path::PathBuf;
use std::time::Instant;

/// Clinical RAG - protocol question answering with a self-scoring benchmark
#[derive(Parser)]
#[command(name = "clinical-rag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a protocol document and answer a question against it
    Ask {
        /// Path to the extracted protocol text (pages separated by form feed)
        document: PathBuf,

        /// The clinical question
        question: String,

        /// Page delimiter in the document file
        #[arg(long, default_value = "\u{c}")]
        delimiter: String,
    },

    /// Index a protocol and run the full benchmark
    Bench {
        /// Path to the extracted protocol text (pages separated by form feed)
        document: PathBuf,

        /// Path to the gold dataset JSON; the built-in sample is used when omitted
        #[arg(short, long)]
        gold: Option<PathBuf>,

        /// Maximum number of gold records to evaluate
        #[arg(long)]
        max_records: Option<usize>,

        /// Page delimiter in the document file
        #[arg(long, default_value = "\u{c}")]
        delimiter: String,

        /// Output path for the plain-text audit log
        #[arg(long, default_value = "evaluation_logs.txt")]
        log_output: PathBuf,

        /// Output path for the structured summary
        #[arg(long, default_value = "evaluation_summary.json")]
        summary_output: PathBuf,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("clinical_rag=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            document,
            question,
            delimiter,
        } => cmd_ask(document, question, delimiter).await,
        Commands::Bench {
            document,
            gold,
            max_records,
            delimiter,
            log_output,
            summary_output,
        } => cmd_bench(document, gold, max_records, delimiter, log_output, summary_output).await,
        Commands::Test => cmd_test().await,
    }
}

async fn load_engine() -> Result<RagEngine> {
    println!("Loading configuration...");
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    println!("Using model: {}", config.llm.model);
    println!("Loading embedding model: {}", config.retrieval.embedding_model);

    RagEngine::from_config(config).context("Failed to initialize engine")
}

async fn index(engine: &RagEngine, document_path: &PathBuf, delimiter: &str) -> Result<()> {
    println!("Indexing document: {}", document_path.display());

    let document =
        Document::from_text_file(document_path, delimiter).context("Failed to load document")?;
    println!("  Document: {} ({} pages)", document.name, document.page_count());

    let start = Instant::now();
    let status = engine
        .index_document(&document)
        .await
        .context("Indexing failed")?;

    println!("  {} ({:.2?})", status, start.elapsed());
    Ok(())
}

async fn cmd_ask(document_path: PathBuf, question: String, delimiter: String) -> Result<()> {
    let engine = load_engine().await?;
    index(&engine, &document_path, &delimiter).await?;

    println!("\nQuestion: {}", question);

    let start = Instant::now();
    let (answer, context) = engine.ask(&question).await.context("Query failed")?;

    println!("\nAnswer:");
    println!("{}", answer);
    println!("\nContext used:");
    println!("{}", "─".repeat(60));
    println!("{}", context);
    println!("{}", "─".repeat(60));
    println!("Answered in {:.2?}", start.elapsed());

    Ok(())
}

async fn cmd_bench(
    document_path: PathBuf,
    gold: Option<PathBuf>,
    max_records: Option<usize>,
    delimiter: String,
    log_output: PathBuf,
    summary_output: PathBuf,
) -> Result<()> {
    let engine = load_engine().await?;
    index(&engine, &document_path, &delimiter).await?;

    let dataset = match gold {
        Some(path) => {
            println!("Loading gold dataset from {}...", path.display());
            GoldDataset::load_json(&path).context("Failed to load gold dataset")?
        }
        None => {
            println!("Using built-in sample gold dataset...");
            create_sample_dataset()
        }
    };
    println!("Dataset: {} ({} queries)", dataset.name, dataset.len());

    let benchmark = Benchmark::new(BenchmarkConfig {
        log_path: log_output.clone(),
        summary_path: summary_output.clone(),
        max_records,
    });

    let report = benchmark
        .run(&engine, &dataset)
        .await
        .context("Benchmark failed")?;

    println!();
    for log in &report.per_query_logs {
        println!("{}", log);
    }

    println!("\n{}", report.summary_text);

    if report.skipped_queries > 0 {
        println!(
            "Warning: {} queries were skipped after unrecoverable errors.",
            report.skipped_queries
        );
    }

    println!("Audit log:   {}", log_output.display());
    println!("Summary:     {}", summary_output.display());

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!(
        "  API Key:   {}...",
        &config.llm.api_key[..config.llm.api_key.len().min(8)]
    );
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => {
            println!("Connection successful!");
        }
        Err(e) => {
            println!("Connection failed: {}", e);
        }
    }

    Ok(())
}
