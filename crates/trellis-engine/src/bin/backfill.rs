//! Trellis Embedding Maintenance
//!
//! Backfill missing concept embeddings, inspect embedding coverage, and
//! clear the semantic response cache.
//!
//! Usage:
//!   cargo run --bin trellis-backfill -- --batch 25
//!   cargo run --bin trellis-backfill -- --status
//!   cargo run --bin trellis-backfill -- --clear-cache ollama
//!   cargo run --bin trellis-backfill -- --init-index

use std::env;
use std::sync::Arc;

use trellis_core::EmbeddingBackend;
use trellis_db::{
    create_pool, PgConceptEmbeddingRepository, PgConceptRepository, PgResponseCacheRepository,
};
use trellis_engine::{defaults, EmbeddingOrchestrator, SemanticCache, VectorIndex};
use trellis_inference::OllamaBackend;

#[derive(Debug)]
enum Command {
    Backfill { batch_size: usize },
    Status,
    ClearCache {
        provider: Option<String>,
        model: Option<String>,
    },
    InitIndex,
}

fn parse_args() -> Command {
    let args: Vec<String> = env::args().collect();
    let mut command = Command::Backfill {
        batch_size: defaults::BACKFILL_BATCH_SIZE,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--batch" | "-b" => {
                i += 1;
                let batch_size = args
                    .get(i)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults::BACKFILL_BATCH_SIZE);
                command = Command::Backfill { batch_size };
            }
            "--status" | "-s" => {
                command = Command::Status;
            }
            "--clear-cache" | "-c" => {
                // Optional positional filters: provider, then model.
                let provider = args
                    .get(i + 1)
                    .filter(|v| !v.starts_with('-'))
                    .cloned();
                if provider.is_some() {
                    i += 1;
                }
                let model = args
                    .get(i + 1)
                    .filter(|v| !v.starts_with('-'))
                    .cloned();
                if model.is_some() {
                    i += 1;
                }
                command = Command::ClearCache { provider, model };
            }
            "--init-index" | "-i" => {
                command = Command::InitIndex;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}. See --help.", other);
                std::process::exit(2);
            }
        }
        i += 1;
    }

    command
}

fn print_help() {
    println!(
        r#"
Trellis Embedding Maintenance

Usage: cargo run --bin trellis-backfill -- [COMMAND]

Commands:
  -b, --batch <N>                     Embed up to N concepts missing an embedding
                                      (default: {batch})
  -s, --status                        Print embedding coverage for the active model
  -c, --clear-cache [PROVIDER [MODEL]]
                                      Delete cached LLM responses; no filter clears
                                      everything
  -i, --init-index                    Load the vector index from the store and
                                      report its size
  -h, --help                          Print help

Environment Variables:
  DATABASE_URL        Postgres connection string (required)
  OLLAMA_BASE         Ollama server URL (default: {url})
  OLLAMA_EMBED_MODEL  Embedding model (default: {embed})
  RUST_LOG            Log filter (default: info)
"#,
        batch = defaults::BACKFILL_BATCH_SIZE,
        url = defaults::OLLAMA_URL,
        embed = defaults::EMBED_MODEL,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .init();

    let command = parse_args();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
    let pool = create_pool(&database_url).await?;

    let backend = Arc::new(OllamaBackend::from_env());
    let embed_model = EmbeddingBackend::model_name(backend.as_ref()).to_string();
    let embeddings = Arc::new(PgConceptEmbeddingRepository::new(pool.clone()));
    let concepts = Arc::new(PgConceptRepository::new(pool.clone()));
    let index = Arc::new(VectorIndex::new());

    match command {
        Command::Backfill { batch_size } => {
            index.initialize(embeddings.as_ref(), &embed_model).await?;
            let orchestrator =
                EmbeddingOrchestrator::new(backend, index, embeddings, concepts);
            let outcome = orchestrator.check_and_generate_missing(batch_size).await?;
            println!(
                "Backfill complete: scanned {}, embedded {}, failed {}",
                outcome.scanned, outcome.embedded, outcome.failed
            );
        }
        Command::Status => {
            let orchestrator =
                EmbeddingOrchestrator::new(backend, index, embeddings, concepts);
            let status = orchestrator.get_embedding_status().await?;
            println!("Model:              {}", orchestrator.model());
            println!("Active concepts:    {}", status.total);
            println!("With embeddings:    {}", status.with_embeddings);
            println!("Without embeddings: {}", status.without_embeddings);
            match status.last_indexed_at {
                Some(at) => println!("Last indexed:       {}", at.to_rfc3339()),
                None => println!("Last indexed:       never"),
            }
        }
        Command::ClearCache { provider, model } => {
            let cache = SemanticCache::new(
                backend,
                Arc::new(PgResponseCacheRepository::new(pool.clone())),
            );
            let deleted = cache
                .clear_cache(provider.as_deref(), model.as_deref())
                .await?;
            println!("Deleted {} cached response(s)", deleted);
        }
        Command::InitIndex => {
            let loaded = index.initialize(embeddings.as_ref(), &embed_model).await?;
            println!("Vector index loaded: {} embedding(s)", loaded);
        }
    }

    Ok(())
}
