//! snomed-graph CLI
//!
//! Operator interface for:
//! - Bulk-loading an extracted RF2 release into Neo4j (`load`)
//! - Cutting a loaded graph down to chosen hierarchies and relationship
//!   types (`slim`)
//! - Read-side lookups against the loaded graph (`query`)

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use snomed_graph_client::SnomedClient;
use snomed_graph_load::{load_release, LoadConfig, LoadPass, Progress, DEFAULT_BATCH_SIZE};
use snomed_graph_rf2::find_release_files;
use snomed_graph_slim::{run_slim, SlimObserver, SlimOptions, SlimStage};
use snomed_graph_store::bolt::{BoltConfig, BoltStore};
use snomed_graph_store::constants::{
    format_concept_id, COMMON_RELATIONSHIP_TYPES, TOP_LEVEL_HIERARCHIES,
};

#[derive(Parser)]
#[command(name = "snomed-graph")]
#[command(
    author,
    version,
    about = "SNOMED CT RF2 release loader and graph reducer"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Bolt connection parameters, shared by every subcommand.
#[derive(Args)]
struct StoreArgs {
    /// Bolt URI of the Neo4j server
    #[arg(long, default_value = "bolt://localhost:7687")]
    uri: String,
    /// Database user
    #[arg(long, default_value = "neo4j")]
    user: String,
    /// Database password
    #[arg(long, default_value = "neo4jneo4j")]
    password: String,
}

impl StoreArgs {
    async fn connect(&self) -> Result<BoltStore> {
        BoltStore::connect(&BoltConfig {
            uri: self.uri.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        })
        .await
        .with_context(|| format!("connecting to {}", self.uri))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-load an extracted RF2 release directory.
    Load {
        /// Directory containing the extracted release (a `Snapshot` or
        /// `Full` subtree is located beneath it)
        #[arg(long)]
        data_dir: PathBuf,
        /// Rows per bulk write
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Reduce a loaded graph to chosen hierarchies and relationship types.
    ///
    /// At least one filter must be given. Names from the built-in tables
    /// (e.g. `clinical_finding`, `finding_site`) resolve to their concept
    /// ids; anything else is taken as a literal id.
    Slim {
        /// Comma-separated relationship-type allow-list
        #[arg(long, value_delimiter = ',')]
        relationships: Option<Vec<String>>,
        /// Comma-separated hierarchy root concepts to retain
        #[arg(long, value_delimiter = ',')]
        hierarchies: Option<Vec<String>>,
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Read-side lookups against the loaded graph.
    Query {
        #[command(subcommand)]
        command: QueryCommands,
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Concept by id, with its fully specified name
    Concept { id: String },
    /// Preferred term (synonym, falling back to the FSN)
    PreferredTerm {
        id: String,
        #[arg(long, default_value = "en")]
        language: String,
    },
    /// Direct supertypes
    Parents { id: String },
    /// Direct subtypes
    Children { id: String },
    /// All transitive supertypes
    Ancestors { id: String },
    /// All transitive subtypes
    Descendants { id: String },
    /// Is `source` a transitive subtype of `target`?
    IsA { source: String, target: String },
    /// Substring search over active description terms
    Search {
        term: String,
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// Outgoing typed relationships of a concept
    Relationships {
        id: String,
        #[arg(long = "type")]
        type_id: Option<String>,
    },
}

/// Resolve a human-readable hierarchy name to its concept id, or pass a
/// literal id through.
fn resolve_hierarchy(name: &str) -> String {
    TOP_LEVEL_HIERARCHIES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| name.to_string())
}

fn resolve_relationship_type(name: &str) -> String {
    COMMON_RELATIONSHIP_TYPES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| name.to_string())
}

struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn pass_started(&self, pass: LoadPass, total_rows: u64) {
        eprintln!(
            "{} {} ({} rows)",
            "loading".cyan().bold(),
            pass.name(),
            total_rows
        );
    }

    fn rows_loaded(&self, pass: LoadPass, loaded: u64) {
        eprintln!("  {} {loaded}", pass.name());
    }

    fn pass_finished(&self, pass: LoadPass, loaded: u64) {
        eprintln!("{} {} ({loaded} loaded)", "ok".green().bold(), pass.name());
    }
}

struct ConsoleObserver;

impl SlimObserver for ConsoleObserver {
    fn type_filter_applied(&self, deleted: u64) {
        eprintln!(
            "{} relationship-type filter ({deleted} deleted)",
            "ok".green().bold()
        );
    }

    fn stage_finished(&self, stage: SlimStage, count: u64) {
        eprintln!("{} {} ({count})", "ok".green().bold(), stage.name());
    }
}

async fn cmd_load(data_dir: &PathBuf, batch_size: usize, store: &StoreArgs) -> Result<()> {
    let files = find_release_files(data_dir)
        .with_context(|| format!("locating RF2 files under {}", data_dir.display()))?;
    eprintln!(
        "{} {}",
        "release".cyan().bold(),
        files.concepts.display().to_string().bold()
    );

    let store = store.connect().await?;
    let config = LoadConfig { batch_size };
    let report = load_release(&store, &files, &config, &ConsoleProgress).await?;

    eprintln!(
        "{} {} concepts, {} descriptions, {} relationships ({} inactive skipped), {} hierarchy edges in {:.1?}",
        "done".green().bold(),
        report.concepts,
        report.descriptions,
        report.relationships,
        report.inactive_relationships_skipped,
        report.hierarchy_edges,
        report.elapsed,
    );
    Ok(())
}

async fn cmd_slim(
    relationships: Option<Vec<String>>,
    hierarchies: Option<Vec<String>>,
    store: &StoreArgs,
) -> Result<()> {
    let options = SlimOptions {
        relationship_types: relationships
            .map(|types| types.iter().map(|t| resolve_relationship_type(t)).collect()),
        hierarchy_roots: hierarchies
            .map(|roots| roots.iter().map(|r| resolve_hierarchy(r)).collect()),
    };

    let store = store.connect().await?;
    let report = run_slim(&store, &options, &ConsoleObserver).await?;

    if let Some(hierarchy) = &report.hierarchy {
        eprintln!(
            "{} {} concepts, {} descriptions, {} relationships removed",
            "done".green().bold(),
            hierarchy.concepts_deleted,
            hierarchy.descriptions_deleted,
            hierarchy.relationships_deleted,
        );
    } else {
        eprintln!("{}", "done".green().bold());
    }
    Ok(())
}

async fn cmd_query(command: QueryCommands, store: &StoreArgs) -> Result<()> {
    let client = SnomedClient::new(store.connect().await?);
    match command {
        QueryCommands::Concept { id } => match client.get_concept(&id).await? {
            Some(summary) => {
                let status = if summary.active { "active" } else { "inactive" };
                println!(
                    "{} [{status}] {}",
                    format_concept_id(&summary.id).bold(),
                    summary.fsn.as_deref().unwrap_or("(no FSN)")
                );
            }
            None => println!("{} {id}", "not found".yellow().bold()),
        },
        QueryCommands::PreferredTerm { id, language } => {
            let term = if language == "en" {
                client.preferred_term(&id).await?
            } else {
                client.preferred_term_in(&id, &language).await?
            };
            match term {
                Some(term) => println!("{term}"),
                None => println!("{} {id}", "no term".yellow().bold()),
            }
        }
        QueryCommands::Parents { id } => print_ids(&client.parents(&id).await?),
        QueryCommands::Children { id } => print_ids(&client.children(&id).await?),
        QueryCommands::Ancestors { id } => print_ids(&client.ancestors(&id).await?),
        QueryCommands::Descendants { id } => print_ids(&client.descendants(&id).await?),
        QueryCommands::IsA { source, target } => {
            println!("{}", client.is_subtype_of(&source, &target).await?);
        }
        QueryCommands::Search { term, limit } => {
            for hit in client.find_concepts_limited(&term, limit).await? {
                println!("{} {}", format_concept_id(&hit.id).bold(), hit.term);
            }
        }
        QueryCommands::Relationships { id, type_id } => {
            let edges = match &type_id {
                Some(type_id) => client.relationships_of_type(&id, type_id).await?,
                None => client.relationships(&id).await?,
            };
            for edge in edges {
                println!("{} -> {}", edge.type_id, format_concept_id(&edge.target_id));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Load {
            data_dir,
            batch_size,
            store,
        } => cmd_load(&data_dir, batch_size, &store).await,
        Commands::Slim {
            relationships,
            hierarchies,
            store,
        } => cmd_slim(relationships, hierarchies, &store).await,
        Commands::Query { command, store } => cmd_query(command, &store).await,
    }
}

fn print_ids(ids: &[String]) {
    for id in ids {
        println!("{}", format_concept_id(id));
    }
}
