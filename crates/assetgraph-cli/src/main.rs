//! Assetgraph CLI
//!
//! Runs one property-graph pass over a JSON asset document:
//! - `scrub`: remove unloadable placeholders
//! - `identifiables`: list identifiables reachable through references
//! - `references`: emit object-reference metadata (mints item ids)
//! - `link`: pair a derived asset's nodes with its base asset's
//! - `convert` / `resolve`: translate between graph and serialization paths
//!
//! Results go to stdout as JSON; status lines go to stderr.

use anyhow::{anyhow, Context, Result};
use assetgraph_quantum::{
    link_to_base_with_config, resolve_serialization_path, DeclaredReferences, GraphPath, IdentifiableObjectCollector,
    ItemIdBaseLinker, MetadataCollector, NodeContainer, PathConverter, QuantumConfig, SerializationPath,
    UnloadableObjectRemover,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod document;

use document::{load_config, AssetDocument};

#[derive(Parser)]
#[command(name = "assetgraph")]
#[command(author, version, about = "Assetgraph: asset property graph passes")]
struct Cli {
    /// Pass configuration (JSON, see `QuantumConfig`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log pass boundaries (`RUST_LOG` takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove unloadable placeholders and report what was removed.
    Scrub {
        input: PathBuf,
        /// Only report; do not modify anything
        #[arg(long)]
        dry_run: bool,
        /// Where to write the scrubbed document (default: overwrite input)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print `identifier -> object` for identifiables reached by reference.
    Identifiables { input: PathBuf },

    /// Print object-reference metadata.
    ///
    /// Converting reference paths may mint item ids; pass `--out` to keep
    /// them.
    References {
        input: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Pair the nodes of a derived asset with those of its base.
    Link { base: PathBuf, derived: PathBuf },

    /// Convert a graph path (`Items->[2].Name`) to its serialization form.
    Convert {
        input: PathBuf,
        path: String,
        /// Depth of non-identifiable regions enclosing the path
        #[arg(long, default_value_t = 0)]
        non_identifiable_depth: usize,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Resolve a serialization path (`Items[~<id>].Name`) against a document.
    Resolve { input: PathBuf, path: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scrub { input, dry_run, out } => cmd_scrub(&input, dry_run, out.as_deref(), &config),
        Commands::Identifiables { input } => cmd_identifiables(&input, &config),
        Commands::References { input, out } => cmd_references(&input, out.as_deref(), &config),
        Commands::Link { base, derived } => cmd_link(&base, &derived, &config),
        Commands::Convert {
            input,
            path,
            non_identifiable_depth,
            out,
        } => cmd_convert(&input, &path, non_identifiable_depth, out.as_deref(), &config),
        Commands::Resolve { input, path } => cmd_resolve(&input, &path),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "assetgraph_quantum=debug,warn" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_scrub(input: &Path, dry_run: bool, out: Option<&Path>, config: &QuantumConfig) -> Result<()> {
    let mut doc = AssetDocument::load(input)?;
    let policy = DeclaredReferences::new(&doc.types);
    let mut remover = UnloadableObjectRemover::new(config.clone());

    if dry_run {
        let found = remover.discover(&doc.graph, &policy)?;
        eprintln!("{} {} placeholder(s) in {}", "Found".yellow().bold(), found.len(), input.display());
        return print_json(&found);
    }

    let removed = remover.run(&mut doc.graph, &policy)?;
    let target = out.unwrap_or(input);
    doc.save(target)?;
    eprintln!(
        "{} {} placeholder(s) {} {}",
        "Removed".green().bold(),
        removed.len(),
        "→".cyan(),
        target.display()
    );
    print_json(&removed)
}

fn cmd_identifiables(input: &Path, config: &QuantumConfig) -> Result<()> {
    let doc = AssetDocument::load(input)?;
    let policy = DeclaredReferences::new(&doc.types);
    let root = NodeContainer::new(&doc.graph).root_node()?;
    let found = IdentifiableObjectCollector::new(config.clone()).collect_from(&doc.graph, &policy, &root)?;
    let table: std::collections::BTreeMap<_, _> = found.iter().map(|(id, node)| (id, node.handle())).collect();
    print_json(&table)
}

fn cmd_references(input: &Path, out: Option<&Path>, config: &QuantumConfig) -> Result<()> {
    let mut doc = AssetDocument::load(input)?;
    let mut collector = MetadataCollector::new(config.clone());
    collector.collect(&doc.graph, &DeclaredReferences::new(&doc.types), &doc.types)?;
    let metadata = collector.finish(&mut doc.graph)?;
    if let Some(out) = out {
        doc.save(out)?;
        eprintln!("{} {}", "Wrote".green().bold(), out.display());
    }
    print_json(&metadata)
}

#[derive(Serialize)]
struct LinkedPair {
    base: String,
    derived: String,
}

fn cmd_link(base: &Path, derived: &Path, config: &QuantumConfig) -> Result<()> {
    let base_doc = AssetDocument::load(base)?;
    let derived_doc = AssetDocument::load(derived)?;
    let policy = DeclaredReferences::new(&derived_doc.types);
    let registry = link_to_base_with_config(&base_doc.graph, &derived_doc.graph, &policy, &ItemIdBaseLinker, config)
        .with_context(|| format!("linking {} to {}", derived.display(), base.display()))?;
    let mut pairs: Vec<LinkedPair> = registry
        .iter()
        .map(|(b, d)| LinkedPair {
            base: b.to_string(),
            derived: d.to_string(),
        })
        .collect();
    pairs.sort_by(|a, b| a.base.cmp(&b.base));
    tracing::debug!(pairs = pairs.len(), "linked");
    eprintln!("{} {} pair(s)", "Linked".green().bold(), pairs.len());
    print_json(&pairs)
}

fn cmd_convert(
    input: &Path,
    path: &str,
    non_identifiable_depth: usize,
    out: Option<&Path>,
    config: &QuantumConfig,
) -> Result<()> {
    let mut doc = AssetDocument::load(input)?;
    let path: GraphPath = path.parse()?;
    let root = doc.graph.root().ok_or_else(|| anyhow!("{} has no root object", input.display()))?;
    let converted = PathConverter::new(config).convert_path(&mut doc.graph, root, &path, non_identifiable_depth)?;
    if let Some(out) = out {
        doc.save(out)?;
    }
    println!("{converted}");
    Ok(())
}

fn cmd_resolve(input: &Path, path: &str) -> Result<()> {
    let doc = AssetDocument::load(input)?;
    let path: SerializationPath = path.parse()?;
    let root = doc.graph.root().ok_or_else(|| anyhow!("{} has no root object", input.display()))?;
    let resolved = resolve_serialization_path(&doc.graph, root, &path)?;
    println!("{resolved}");
    Ok(())
}
