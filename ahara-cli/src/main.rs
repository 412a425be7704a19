//! Ahara CLI - build the knowledge index and chat with the dietician
//!
//! # Commands
//!
//! ```bash
//! # Preview how a document is chunked
//! ahara chunk --strategy recursive charts/vata.txt
//!
//! # Chunk, embed and persist the index pair
//! ahara build charts/*.txt --out data/ayurveda
//!
//! # Show what the retriever finds for a question
//! ahara search "Can Pitta eat chilli?" -k 3
//!
//! # Chat (one-shot, or interactive without a message)
//! ahara chat --user u1 --dosha Pitta "Can I eat chilli?"
//!
//! # Structured advice on one food
//! ahara food --dosha Vata --food mango --goal "weight gain"
//!
//! # Convert a plain-text rule chart to the JSON rule file
//! ahara rules convert data.txt --out data/dosha_rules.json
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahara_lib::{
    chat::{ChatRequest, ChatService},
    chunk::{chunk_documents, Chunk, ChunkMetadata, Chunker, FixedSizeChunker, RecursiveChunker},
    config::{Settings, API_KEY_ENV},
    embed::{Embedder, MiniLmEmbedder},
    generate::GeminiGenerator,
    rules::{parse_chart, RuleTable},
    search::{IndexArtifacts, Retriever, SearchEngine},
    session::SessionStore,
    store::FlatIndex,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ahara")]
#[command(about = "Dosha-aware diet assistant over a local Ayurveda knowledge base")]
#[command(version)]
struct Cli {
    /// JSON settings file (fields not given fall back to defaults)
    #[arg(long, global = true, default_value = "ahara.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Recursive,
    Fixed,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk a document and show the result
    Chunk {
        /// Input file to chunk
        input: PathBuf,

        #[arg(short, long, value_enum, default_value = "recursive")]
        strategy: Strategy,

        /// Maximum chunk length in characters
        #[arg(long)]
        size: Option<usize>,

        /// Overlap between consecutive chunks in characters
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Chunk, embed and persist documents as the retrieval index
    Build {
        /// Text documents, indexed in the order given
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Artifact base path (defaults to the configured one)
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "recursive")]
        strategy: Strategy,
    },

    /// Search the persisted index
    Search {
        query: String,

        /// Number of results to return
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Ask the dietician; without a message, start an interactive session
    Chat {
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Constitution type, e.g. Vata, Pitta or Kapha
        #[arg(short, long)]
        dosha: String,

        message: Option<String>,
    },

    /// Structured advice on a single food
    Food {
        #[arg(short, long)]
        dosha: String,

        #[arg(short, long)]
        food: String,

        #[arg(short, long, default_value = "general wellbeing")]
        goal: String,
    },

    /// Rule file tools
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Convert a plain-text rule chart to JSON
    Convert {
        input: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn make_chunker(strategy: Strategy, size: usize, overlap: usize) -> Box<dyn Chunker> {
    match strategy {
        Strategy::Fixed => Box::new(FixedSizeChunker {
            chunk_size: size,
            overlap,
        }),
        Strategy::Recursive => Box::new(RecursiveChunker::new(size, overlap)),
    }
}

fn load_documents(inputs: &[PathBuf]) -> Result<Vec<(String, String)>> {
    inputs
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok((source_name(path), text))
        })
        .collect()
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn preview(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        out.push_str("...");
    }
    out
}

fn load_engine(settings: &Settings) -> Result<SearchEngine<MiniLmEmbedder, FlatIndex>> {
    let loaded = IndexArtifacts::new(&settings.artifacts).load()?;
    let embedder = MiniLmEmbedder::new(settings.model_cache_dir.clone())?;
    if embedder.model_name() != loaded.model {
        bail!(
            "index was built with {} but the embedder is {}",
            loaded.model,
            embedder.model_name()
        );
    }
    Ok(SearchEngine::from_parts(embedder, loaded.index, loaded.chunks)?)
}

fn build_service(settings: &mut Settings) -> Result<ChatService<MiniLmEmbedder>> {
    let api_key = settings
        .api_key
        .take()
        .with_context(|| format!("{API_KEY_ENV} is not set"))?;

    let rules = RuleTable::load(&settings.rules_path)?;
    let cache_dir = settings.model_cache_dir.clone();
    let retriever = Retriever::from_artifacts(IndexArtifacts::new(&settings.artifacts), move || {
        MiniLmEmbedder::new(cache_dir.clone())
    });
    let generator =
        GeminiGenerator::new(api_key, settings.model.clone(), settings.max_output_tokens)?;

    Ok(ChatService::new(
        Arc::new(retriever),
        Arc::new(rules),
        Arc::new(SessionStore::new()),
        Arc::new(generator),
    )
    .with_config(settings.chat_config()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(Some(cli.settings.as_path()))?;

    match cli.command {
        Commands::Chunk {
            input,
            strategy,
            size,
            overlap,
        } => {
            let text = fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let chunker = make_chunker(
                strategy,
                size.unwrap_or(settings.chunk_size),
                overlap.unwrap_or(settings.chunk_overlap),
            );
            let chunks: Vec<Chunk> =
                chunker.chunk(&text, ChunkMetadata::for_source(source_name(&input)));

            println!(
                "Chunked '{}' into {} chunks using {} strategy:\n",
                input.display(),
                chunks.len(),
                chunker.name()
            );
            for (i, chunk) in chunks.iter().enumerate() {
                println!(
                    "--- Chunk {} ({} chars at {}, id: {}) ---",
                    i + 1,
                    chunk.content.chars().count(),
                    chunk.metadata.position,
                    chunk.id
                );
                println!("{}\n", preview(&chunk.content, 200));
            }
        }

        Commands::Build {
            inputs,
            out,
            strategy,
        } => {
            let documents = load_documents(&inputs)?;
            let chunker = make_chunker(strategy, settings.chunk_size, settings.chunk_overlap);
            let chunks = chunk_documents(chunker.as_ref(), &documents);
            if chunks.is_empty() {
                bail!("no text to index in {} document(s)", documents.len());
            }
            info!(documents = documents.len(), chunks = chunks.len(), "chunked corpus");

            println!("Loading embedding model (first run downloads it)...");
            let embedder = MiniLmEmbedder::new(settings.model_cache_dir.clone())?;
            let mut engine = SearchEngine::new(embedder, FlatIndex::new());
            println!("Indexing {} chunks...", chunks.len());
            engine.index(&chunks)?;

            let artifacts = IndexArtifacts::new(out.as_ref().unwrap_or(&settings.artifacts));
            artifacts.save(&engine)?;
            println!(
                "Wrote {} and {}",
                artifacts.index_path.display(),
                artifacts.chunks_path.display()
            );
        }

        Commands::Search { query, k } => {
            let engine = load_engine(&settings)?;
            let k = k.unwrap_or(settings.top_k);
            let results = engine.search(&query, k)?;

            println!("\n=== Results for '{query}' (k={k}) ===\n");
            for (i, result) in results.iter().enumerate() {
                let source = result.chunk.metadata.source_id.as_deref().unwrap_or("-");
                println!(
                    "#{} row {} from {source} (distance: {:.4})",
                    i + 1,
                    result.row,
                    result.distance
                );
                println!("---");
                println!("{}\n", preview(&result.chunk.content, 300));
            }
        }

        Commands::Chat {
            user,
            dosha,
            message,
        } => {
            let service = build_service(&mut settings)?;

            if let Some(message) = message {
                let reply = service.chat(&ChatRequest::new(user, dosha, message)).await?;
                println!("{}", reply.response);
                return Ok(());
            }

            if let Err(e) = service.warm_up().await {
                warn!(error = %e, "retrieval index not loaded, answers will fall back");
            }
            println!("Chatting as '{user}' ({dosha}). Empty line or Ctrl-D to quit.");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                print!("> ");
                std::io::stdout().flush()?;
                let Some(line) = lines.next_line().await? else {
                    break;
                };
                if line.trim().is_empty() {
                    break;
                }
                let reply = service
                    .chat(&ChatRequest::new(user.as_str(), dosha.as_str(), line))
                    .await?;
                println!("{}\n", reply.response);
            }
        }

        Commands::Food { dosha, food, goal } => {
            let service = build_service(&mut settings)?;
            let reply = service.food_advice(&dosha, &food, &goal).await?;
            if reply.is_fallback() {
                warn!("food advice fell back");
            }
            println!("{}", reply.response);
        }

        Commands::Rules { command } => match command {
            RulesCommand::Convert { input, out } => {
                let text = fs::read_to_string(&input)
                    .with_context(|| format!("failed to read {}", input.display()))?;
                let table = parse_chart(&text);
                let json = table.to_json_pretty()?;

                match out {
                    Some(path) => {
                        fs::write(&path, json)?;
                        println!(
                            "Wrote {} constitution types to {}",
                            table.constitutions().len(),
                            path.display()
                        );
                    }
                    None => println!("{json}"),
                }
            }
        },
    }

    Ok(())
}
