use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use rescache::cache::{Document, FetchingCache, LocalCache, ResourceIdentifier};
use rescache::config::Config;
use rescache::logging;
use rescache::remote::{self, RemoteSource};

#[derive(Parser, Debug)]
#[command(name = "rescache")]
#[command(about = "Query JSON:API resources through a read-through cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/rescache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Extra JSON document pushed into the cache before querying
  #[arg(short, long)]
  seed: Vec<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Get one resource
  Get {
    /// Resource type
    kind: String,
    /// Resource id
    id: String,
  },

  /// Get several resources given as TYPE:ID
  Many {
    #[arg(required = true)]
    identifiers: Vec<ResourceIdentifier>,
  },

  /// List cached resources of one type (never fetches)
  All {
    /// Resource type
    kind: String,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  let store = Arc::new(LocalCache::new());
  for path in config.seed.iter().chain(args.seed.iter()) {
    store.push_document(read_document(path)?);
  }
  info!(objects = store.len(), "Seeded local cache");

  let cache: FetchingCache = match &config.remote {
    Some(remote) => RemoteSource::new(remote)?.into_fetching_cache(store),
    None => remote::offline_cache(store),
  };

  let output = match args.command {
    Commands::Get { kind, id } => {
      let found = cache.get_one(ResourceIdentifier::new(kind, id)).await;
      serde_json::json!({ "data": found.as_deref() })
    }
    Commands::Many { identifiers } => {
      let get = cache.get_many(identifiers).await;
      let found: Vec<_> = get.result.iter().map(|o| o.as_ref()).collect();
      serde_json::json!({ "data": found, "missing": get.missing })
    }
    Commands::All { kind } => {
      let found = cache.all_of_type(&kind).await;
      let found: Vec<_> = found.iter().map(|o| o.as_ref()).collect();
      serde_json::json!({ "data": found })
    }
  };

  for failure in cache.take_failures() {
    warn!("{}", failure);
  }
  info!("{}", cache.stats());

  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

fn read_document(path: &Path) -> Result<Document> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read seed document {}: {}", path.display(), e))?;

  serde_json::from_str(&contents)
    .map_err(|e| eyre!("Failed to parse seed document {}: {}", path.display(), e))
}
