//! faqweave CLI: analyze, search and import FAQ collections.
//!
//! Usage:
//!   faqweave import <faq.json> [--db path]
//!   faqweave analyze [--input faq.json | --db path] [--algorithm name] [--report out.json] [--save]
//!   faqweave search <question> [--input faq.json | --db path] [--top-k n] [--threshold t]
//!   faqweave config

use clap::{Args, Parser, Subcommand};
use faqweave::analysis::TracingProgress;
use faqweave::{
    import_faq_file, AlgorithmOrchestrator, ExecutionContext, ExecutionReport, FaqNode, FaqSearcher,
    HashedBagOfWords, NodeStore, OpenStore, PipelineConfig, SqliteStore, Vectorizer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "faqweave",
    version,
    about = "FAQ analysis: duplicates, clusters, learning order and answer quality"
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Read nodes from a faq.json file instead of the database
    #[arg(long)]
    input: Option<PathBuf>,
    /// Path to SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,
    /// YAML pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Use learned embeddings instead of hashed bag-of-words
    #[arg(long)]
    embeddings: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a faq.json file into the database
    Import {
        /// Path to faq.json
        path: PathBuf,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Run the analysis pipeline
    Analyze {
        #[command(flatten)]
        source: Source,
        /// Run a single algorithm by name
        #[arg(long)]
        algorithm: Option<String>,
        /// Write the full JSON report here
        #[arg(long)]
        report: Option<PathBuf>,
        /// Save updated nodes and connections back to the database
        #[arg(long)]
        save: bool,
    },
    /// Find the FAQ entries closest to a question
    Search {
        /// The question to look up
        question: String,
        #[command(flatten)]
        source: Source,
        /// Maximum number of hits
        #[arg(long)]
        top_k: Option<usize>,
        /// Minimum similarity in [0, 1]
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Print the default pipeline configuration as YAML
    Config,
}

/// Get the default database path (~/.local/share/faqweave/faqweave.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("faqweave").join("faqweave.db")
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteStore, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database {}: {}", db_path.display(), e))
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, String> {
    match path {
        Some(path) => PipelineConfig::load(path).map_err(|e| format!("Failed to load {}: {}", path.display(), e)),
        None => Ok(PipelineConfig::default()),
    }
}

fn build_vectorizer(embeddings: bool) -> Result<Arc<dyn Vectorizer>, String> {
    if !embeddings {
        return Ok(Arc::new(HashedBagOfWords));
    }
    #[cfg(feature = "embeddings")]
    {
        let model = faqweave::text::FastEmbedVectorizer::multilingual()
            .map_err(|e| format!("Failed to load embedding model: {}", e))?;
        Ok(Arc::new(model))
    }
    #[cfg(not(feature = "embeddings"))]
    {
        Err("--embeddings requires building with the `embeddings` feature".to_string())
    }
}

/// Nodes from `--input` when given, otherwise from the database
fn load_nodes(source: &Source) -> Result<(Vec<FaqNode>, Option<SqliteStore>), String> {
    if let Some(input) = &source.input {
        let (nodes, stats) =
            import_faq_file(input).map_err(|e| format!("Failed to import {}: {}", input.display(), e))?;
        if stats.skipped() > 0 {
            warn!(skipped = stats.skipped(), "Some FAQ entries were skipped");
        }
        return Ok((nodes, None));
    }
    let store = open_store(source.db.clone())?;
    let nodes = store.load_all().map_err(|e| format!("Failed to load nodes: {}", e))?;
    if nodes.is_empty() {
        return Err("database holds no nodes; run `faqweave import` first".to_string());
    }
    Ok((nodes, Some(store)))
}

fn cmd_import(path: &Path, db: Option<PathBuf>) -> i32 {
    let (nodes, stats) = match import_faq_file(path) {
        Ok(imported) => imported,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let store = match open_store(db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Err(e) = store.save_all(&nodes) {
        eprintln!("Error: {}", e);
        return 1;
    }
    println!(
        "Imported {} of {} entries ({} variations)",
        stats.valid_items, stats.total_items, stats.total_variations
    );
    0
}

fn print_summary(report: &ExecutionReport) {
    println!("{:<24}  {:<10}  {:>11}  {:>6}  {:>11}  {:>8}", "ALGORITHM", "STATUS", "CONNECTIONS", "GROUPS", "SUGGESTIONS", "MS");
    println!("{}", "-".repeat(80));
    for result in &report.results {
        println!(
            "{:<24}  {:<10}  {:>11}  {:>6}  {:>11}  {:>8}",
            result.algorithm,
            format!("{:?}", result.status),
            result.connections.len(),
            result.groups.len(),
            result.suggestions.len(),
            result.elapsed.as_millis()
        );
        for error in &result.errors {
            println!("    error: {}", error);
        }
    }
    println!();
    for group in &report.groups {
        println!("group '{}': {} member(s)", group.name, group.members.len());
    }
    let mut suggestions: Vec<_> = report.suggestions.iter().collect();
    suggestions.sort_by(|a, b| b.priority.cmp(&a.priority));
    for s in suggestions.iter().take(10) {
        println!("[p{}] {:?}: {}", s.priority, s.suggestion_type, s.description);
    }
}

async fn cmd_analyze(source: Source, algorithm: Option<String>, report_path: Option<PathBuf>, save: bool) -> i32 {
    let config = match load_config(source.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let vectorizer = match build_vectorizer(source.embeddings) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut orchestrator = AlgorithmOrchestrator::with_vectorizer(vectorizer);
    if let Err(e) = config.apply(&mut orchestrator) {
        eprintln!("Error: {}", e);
        return 1;
    }
    let (mut nodes, store) = match load_nodes(&source) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let ctx = ExecutionContext::new().with_progress(Arc::new(TracingProgress));
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling analysis");
            cancel.cancel();
        }
    });

    let report = match algorithm {
        Some(name) => match orchestrator.run_one(&name, &mut nodes, &ctx).await {
            Ok(result) => ExecutionReport::from_results(vec![result]),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
        None => orchestrator.run_all(&mut nodes, &ctx).await,
    };
    print_summary(&report);

    if let Some(path) = report_path {
        let written = serde_json::to_string_pretty(&report)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("Error: failed to write report {}: {}", path.display(), e);
            return 1;
        }
        info!(path = %path.display(), "Wrote analysis report");
    }

    if save && !report.cancelled {
        let store = match store {
            Some(s) => s,
            None => match open_store(source.db) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            },
        };
        let saved = store
            .save_all(&nodes)
            .and_then(|_| store.save_connections(&report.connections));
        if let Err(e) = saved {
            eprintln!("Error: {}", e);
            return 1;
        }
        println!("Saved {} nodes and {} connections", nodes.len(), report.connections.len());
    }

    if report.overall_success {
        0
    } else {
        2
    }
}

fn cmd_search(question: &str, source: Source, top_k: Option<usize>, threshold: Option<f64>) -> i32 {
    let config = match load_config(source.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let searcher = build_vectorizer(source.embeddings)
        .and_then(|vectorizer| {
            let (nodes, _) = load_nodes(&source)?;
            FaqSearcher::with_vectorizer(nodes, vectorizer, config.search).map_err(|e| e.to_string())
        });
    let searcher = match searcher {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let hits = searcher.search_with(
        question,
        top_k.unwrap_or(config.search.top_k),
        threshold.unwrap_or(config.search.threshold),
    );
    match hits {
        Ok(hits) if hits.is_empty() => {
            println!("No matching FAQ entries.");
            0
        }
        Ok(hits) => {
            for hit in hits {
                println!("[{:.3}] {}", hit.similarity, hit.query);
                if hit.matched_text != hit.query {
                    println!("        matched: {}", hit.matched_text);
                }
                println!("        {}", hit.response);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_config() -> i32 {
    let defaults = PipelineConfig::from_orchestrator(&AlgorithmOrchestrator::with_default_algorithms());
    match defaults.to_yaml() {
        Ok(yaml) => {
            print!("{}", yaml);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::Import { path, db } => cmd_import(&path, db),
        Commands::Analyze {
            source,
            algorithm,
            report,
            save,
        } => cmd_analyze(source, algorithm, report, save).await,
        Commands::Search {
            question,
            source,
            top_k,
            threshold,
        } => cmd_search(&question, source, top_k, threshold),
        Commands::Config => cmd_config(),
    };
    std::process::exit(code);
}
