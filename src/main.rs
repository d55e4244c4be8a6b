//! rog CLI: reporting-obligation knowledge graph.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Deserialize;

use ro_graph::annotation::AnnotationNode;
use ro_graph::config::{RoConfig, StoreConfig};
use ro_graph::graph::builder::{next_sequence_number, GraphBuilder};
use ro_graph::graph::concepts::ConceptBuilder;
use ro_graph::graph::is_iri;
use ro_graph::id::{IdMinter, MintStrategy, SequentialMinter};
use ro_graph::ingest::{Ingestor, SourceSpec};
use ro_graph::namespace::Namespaces;
use ro_graph::ontology::Ontology;
use ro_graph::query::{Constraint, Filter, Page, QueryProvider, TextMatch};
use ro_graph::store::{io, GraphFormat, TripleStore};

#[derive(Parser)]
#[command(name = "rog", version, about = "Reporting-obligation knowledge graph")]
struct Cli {
    /// Data directory holding `config.toml` and the embedded store.
    #[arg(long, global = true, default_value = ".ro-graph")]
    data_dir: PathBuf,

    /// Config file (defaults to `<data-dir>/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and declare the ontology schema.
    Init,

    /// Ingest (or re-ingest) an annotated document tree from a JSON file.
    Ingest {
        #[arg(long)]
        file: PathBuf,

        /// Caller-assigned document id; an absolute IRI becomes the document node.
        #[arg(long)]
        doc_id: String,

        /// IRI of the site the document was retrieved from.
        #[arg(long)]
        source_url: Option<String>,

        #[arg(long, requires = "source_url")]
        source_name: Option<String>,
    },

    /// Remove a document and everything extracted from it.
    Remove {
        #[arg(long)]
        doc_id: String,
    },

    /// Add glossary terms from a JSON file `{"terms": [...], "definitions": [...]}`.
    Terms {
        #[arg(long)]
        file: PathBuf,
    },

    /// List the entity predicates declared in the schema.
    Types,

    /// List the entity labels reachable through one predicate.
    Values {
        /// Predicate IRI or local name in the obligation namespace (e.g. `hasReporter`).
        #[arg(long)]
        predicate: String,

        /// Keep repeated labels.
        #[arg(long)]
        all: bool,
    },

    /// Filter reporting obligations by entity values.
    Filter {
        /// `PREDICATE=VALUE[|VALUE...]`; repeat for AND.
        #[arg(long = "constraint", short = 'c')]
        constraints: Vec<String>,

        /// Match values as case-insensitive substrings instead of whole labels.
        #[arg(long)]
        substring: bool,

        /// Restrict to these documents.
        #[arg(long = "doc")]
        documents: Vec<String>,

        /// Restrict to documents from this source.
        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value = "0")]
        offset: usize,

        /// Print obligation texts instead of ids.
        #[arg(long)]
        texts: bool,
    },

    /// List entity values, grouped with counts, or for one predicate.
    Entities {
        #[arg(long)]
        predicate: Option<String>,

        /// Only labels containing this text; labels starting with it come first.
        #[arg(long, requires = "predicate")]
        text: Option<String>,

        #[arg(long = "constraint", short = 'c')]
        constraints: Vec<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one reporting obligation with its entities.
    Lookup {
        #[arg(long)]
        id: String,
    },

    /// Serialize the whole graph.
    Export {
        #[arg(long, default_value = "rdfxml")]
        format: GraphFormat,

        /// Output file (stdout when omitted).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Load an RDF document into the graph.
    Load {
        #[arg(long)]
        file: PathBuf,

        #[arg(long, default_value = "rdfxml")]
        format: GraphFormat,
    },

    /// Show store statistics.
    Info,
}

#[derive(Deserialize)]
struct TermsFile {
    terms: Vec<String>,
    #[serde(default)]
    definitions: Option<Vec<Option<String>>>,
    /// Concept IRI to related concept IRIs.
    #[serde(default)]
    similar: BTreeMap<String, Vec<String>>,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.data_dir.join("config.toml"));

    match cli.command {
        Commands::Init => {
            let config = if config_path.exists() {
                RoConfig::load(&config_path)?
            } else {
                let config = default_config(&cli.data_dir);
                config.save(&config_path)?;
                config
            };
            let ontology = Ontology::new(config.namespaces()?);
            let store = config.with_env_overrides().open_store()?;
            let added = ontology.declare_schema(&store)?;
            println!("Initialized ro-graph at {}", cli.data_dir.display());
            println!("Config: {}", config_path.display());
            println!("Schema triples added: {added}");
        }

        Commands::Ingest {
            file,
            doc_id,
            source_url,
            source_name,
        } => {
            let (config, ns, store) = open(&config_path, &cli.data_dir)?;
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            let tree = AnnotationNode::from_json(&content)?;
            let ontology = Ontology::new(ns);
            ontology.declare_schema(&store)?;
            let minter: Box<dyn IdMinter> = match config.minting {
                // Continue numbering after the nodes already in the store.
                MintStrategy::Sequential => Box::new(SequentialMinter::starting_from(
                    next_sequence_number(&store, ontology.namespaces())?,
                )),
                strategy => strategy.build(),
            };
            let builder = GraphBuilder::new(ontology, minter).with_language(config.language.as_str());
            let ingestor = Ingestor::new(&store, builder);
            let source = source_url.map(|url| SourceSpec::new(url, source_name));
            let annotated = ingestor.ingest(&tree, &doc_id, source.as_ref())?;
            let json = serde_json::to_string_pretty(&annotated).into_diagnostic()?;
            println!("{json}");
        }

        Commands::Remove { doc_id } => {
            let (config, ns, store) = open(&config_path, &cli.data_dir)?;
            let builder = GraphBuilder::new(Ontology::new(ns), config.minting.build());
            let removed = Ingestor::new(&store, builder).remove(&doc_id)?;
            println!("Removed {removed} triples for {doc_id}");
        }

        Commands::Terms { file } => {
            let (config, ns, store) = open(&config_path, &cli.data_dir)?;
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            let input: TermsFile = serde_json::from_str(&content).into_diagnostic()?;
            // Continue numbering after the concepts already in the store.
            let existing = ConceptBuilder::new(ns.clone()).terms(&store)?;
            let next = existing
                .iter()
                .filter_map(|(id, _)| ro_graph::id::sequence_number(id, ns.concepts(), ""))
                .max()
                .map_or(0, |n| n + 1);
            let concepts =
                ConceptBuilder::with_minter(ns, Box::new(SequentialMinter::starting_from(next)))
                    .with_language(config.language.as_str());
            let ids = concepts.add_entity_terms(&store, &input.terms, input.definitions.as_deref())?;
            let links = concepts.add_similar_terms(&store, &input.similar)?;
            for (id, term) in ids.iter().zip(&input.terms) {
                println!("{id}\t{term}");
            }
            println!("Added {} terms, {links} similarity links", ids.len());
        }

        Commands::Types => {
            let (_, ns, store) = open(&config_path, &cli.data_dir)?;
            for pred in QueryProvider::new(&store, ns).entity_predicate_types()? {
                println!("{pred}");
            }
        }

        Commands::Values { predicate, all } => {
            let (_, ns, store) = open(&config_path, &cli.data_dir)?;
            let predicate = resolve_predicate(&ns, &predicate);
            let values = QueryProvider::new(&store, ns).values_for_predicate(&predicate, !all)?;
            for value in values {
                println!("{value}");
            }
        }

        Commands::Filter {
            constraints,
            substring,
            documents,
            source,
            limit,
            offset,
            texts,
        } => {
            let (_, ns, store) = open(&config_path, &cli.data_dir)?;
            let mut filter = build_filter(&ns, &constraints)?.exact_match(!substring);
            if !documents.is_empty() {
                filter = filter.documents(documents);
            }
            if let Some(source) = source {
                filter = filter.source(source);
            }
            let queries = QueryProvider::new(&store, ns);
            if texts {
                for text in queries.filter_obligations(&filter)? {
                    println!("{text}");
                }
            } else {
                let page = queries.filter_obligation_ids(&filter, Page::new(limit, offset))?;
                let json = serde_json::to_string_pretty(&page).into_diagnostic()?;
                println!("{json}");
            }
        }

        Commands::Entities {
            predicate,
            text,
            constraints,
            limit,
        } => {
            let (_, ns, store) = open(&config_path, &cli.data_dir)?;
            let filter = build_filter(&ns, &constraints)?;
            let queries = QueryProvider::new(&store, ns.clone());
            match predicate {
                Some(predicate) => {
                    let predicate = resolve_predicate(&ns, &predicate);
                    let text = text.map(TextMatch::contains);
                    let values =
                        queries.filter_entities_lazy(&predicate, text.as_ref(), &filter, limit)?;
                    for value in values {
                        println!("{value}");
                    }
                }
                None => {
                    let groups = queries.filter_entities_grouped(&filter)?;
                    let json = serde_json::to_string_pretty(&groups).into_diagnostic()?;
                    println!("{json}");
                }
            }
        }

        Commands::Lookup { id } => {
            let (_, ns, store) = open(&config_path, &cli.data_dir)?;
            match QueryProvider::new(&store, ns).obligation(&id)? {
                Some(detail) => {
                    let json = serde_json::to_string_pretty(&detail).into_diagnostic()?;
                    println!("{json}");
                }
                None => miette::bail!("no reporting obligation with id {id}"),
            }
        }

        Commands::Export { format, output } => {
            let (_, ns, store) = open(&config_path, &cli.data_dir)?;
            let count = match output {
                Some(path) => {
                    let file = std::fs::File::create(&path).into_diagnostic()?;
                    let count = io::export(&store, format, &ns, std::io::BufWriter::new(file))?;
                    eprintln!("Wrote {count} triples to {}", path.display());
                    count
                }
                None => io::export(&store, format, &ns, std::io::stdout().lock())?,
            };
            tracing::debug!(count, %format, "export finished");
        }

        Commands::Load { file, format } => {
            let (_, _, store) = open(&config_path, &cli.data_dir)?;
            let reader = std::io::BufReader::new(std::fs::File::open(&file).into_diagnostic()?);
            let count = io::load(&store, format, reader)?;
            println!("Loaded {count} triples from {}", file.display());
        }

        Commands::Info => {
            let (config, ns, store) = open(&config_path, &cli.data_dir)?;
            let queries = QueryProvider::new(&store, ns);
            println!("ro-graph store");
            println!("  backend:     {}", backend_name(&config.store));
            println!("  triples:     {}", store.len()?);
            println!("  documents:   {}", queries.all_document_ids()?.len());
            println!("  obligations: {}", queries.all_obligation_ids()?.len());
            println!("  namespace:   {}", queries.namespaces().obligations());
        }
    }

    Ok(())
}

/// Config for a fresh data directory: an on-disk store inside it.
fn default_config(data_dir: &Path) -> RoConfig {
    RoConfig {
        store: StoreConfig::Disk {
            path: data_dir.join("store"),
        },
        ..RoConfig::default()
    }
}

/// Load config (or defaults), apply environment overrides and open the store.
fn open(path: &Path, data_dir: &Path) -> Result<(RoConfig, Namespaces, Box<dyn TripleStore>)> {
    let config = if path.exists() {
        RoConfig::load(path)?
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        default_config(data_dir)
    };
    let config = config.with_env_overrides();
    let ns = config.namespaces()?;
    let store = config.open_store()?;
    Ok((config, ns, store))
}

/// Accept either a full IRI or a local name in the obligation namespace.
fn resolve_predicate(ns: &Namespaces, predicate: &str) -> String {
    if is_iri(predicate) {
        predicate.to_string()
    } else {
        ns.ro(predicate)
    }
}

/// Parse `PREDICATE=V1|V2` arguments into a filter.
fn build_filter(ns: &Namespaces, args: &[String]) -> Result<Filter> {
    let mut filter = Filter::new();
    for arg in args {
        let Some((predicate, values)) = arg.split_once('=') else {
            miette::bail!("malformed constraint {arg:?}: expected PREDICATE=VALUE or PREDICATE=V1|V2");
        };
        filter = filter.constraint(Constraint::new(
            resolve_predicate(ns, predicate.trim()),
            values.split('|').filter(|v| !v.trim().is_empty()),
        ));
    }
    Ok(filter)
}

fn backend_name(store: &StoreConfig) -> String {
    match store {
        StoreConfig::Memory => "memory".to_string(),
        StoreConfig::Disk { path } => format!("disk ({})", path.display()),
        StoreConfig::Remote(remote) => format!("remote ({})", remote.query_endpoint),
    }
}
