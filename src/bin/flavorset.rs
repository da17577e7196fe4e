//! flavorset CLI - validate flavor declarations and render records to JSON
//!
//! Loads a model schema, rule declarations and (for rendering) a data file,
//! all in YAML.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use flavorset::store::{MemoryStore, RecordKey};
use flavorset::{Flavor, NdjsonWriter, RuleRegistry, Schema, Serializer, SerializerConfig};

#[derive(Parser)]
#[command(name = "flavorset")]
#[command(version, about = "Flavor-based projection of object graphs to JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a schema and its rule declarations
    Validate {
        /// Path to the model schema
        #[arg(short, long, default_value = "schema.yaml")]
        schema: PathBuf,

        /// Path to the rule declarations
        #[arg(short, long, default_value = "rules.yaml")]
        rules: PathBuf,
    },

    /// Render records from a data file
    Render {
        /// Path to the model schema
        #[arg(short, long, default_value = "schema.yaml")]
        schema: PathBuf,

        /// Path to the rule declarations
        #[arg(short, long, default_value = "rules.yaml")]
        rules: PathBuf,

        /// Path to the data file
        #[arg(short, long, default_value = "data.yaml")]
        data: PathBuf,

        /// Model class to render
        #[arg(long)]
        class: String,

        /// Record id; every record of the class is rendered as NDJSON when omitted
        #[arg(long)]
        id: Option<String>,

        /// Flavor to render with
        #[arg(short, long, default_value = "default")]
        flavor: String,

        /// Serializer config file (max_depth, key_case, type_field)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print a single record
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { schema, rules } => validate(schema, rules),
        Commands::Render { schema, rules, data, class, id, flavor, config, pretty } => {
            render(schema, rules, data, class, id, flavor, config, pretty)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_registry(schema_path: &PathBuf, rules_path: &PathBuf) -> Result<RuleRegistry, String> {
    let schema = Schema::load_from_file(schema_path)
        .map_err(|e| format!("Failed to load schema: {}", e))?;
    let mut registry = RuleRegistry::new(Arc::new(schema));
    registry
        .load_from_file(rules_path)
        .map_err(|e| format!("Failed to load rules: {}", e))?;
    Ok(registry)
}

/// Load schema and rules, then print what each class declares
fn validate(schema_path: PathBuf, rules_path: PathBuf) -> Result<(), String> {
    println!("🔍 Validating {} against {}...", rules_path.display(), schema_path.display());

    let registry = load_registry(&schema_path, &rules_path)?;
    let schema = registry.schema();
    println!("  ✓ Loaded {} models", schema.len());
    println!("  ✓ Loaded {} flavor declarations", registry.len());

    for class in schema.model_names() {
        let flavors = registry.flavors_for(class);
        if flavors.is_empty() {
            println!("\n  {} (no declarations)", class);
            continue;
        }
        println!("\n  {}", class);
        for flavor in flavors {
            if let Some(rules) = registry.lookup(class, flavor) {
                println!("    {}: {}", flavor, rules);
            }
        }
    }

    println!("\n✨ Validation passed");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn render(
    schema_path: PathBuf,
    rules_path: PathBuf,
    data_path: PathBuf,
    class: String,
    id: Option<String>,
    flavor: String,
    config_path: Option<PathBuf>,
    pretty: bool,
) -> Result<(), String> {
    let registry = load_registry(&schema_path, &rules_path)?;
    if !registry.schema().contains(&class) {
        return Err(format!("Unknown model class '{}'", class));
    }

    let config = match config_path {
        Some(path) => SerializerConfig::load_from_file(&path),
        None => Ok(SerializerConfig::default()),
    }
    .and_then(SerializerConfig::with_env_overrides)
    .map_err(|e| format!("Failed to load config: {}", e))?;

    let store = MemoryStore::load_from_file(registry.schema().clone(), &data_path)
        .map_err(|e| format!("Failed to load data: {}", e))?
        .into_shared();

    let serializer = Serializer::new(Arc::new(registry), config);
    let flavor = Flavor::named(flavor);

    match id {
        Some(id) => {
            let entity = store
                .entity(&RecordKey::new(class, id))
                .map_err(|e| e.to_string())?;
            let json = if pretty {
                serializer.to_json_pretty(entity.as_ref(), flavor)
            } else {
                serializer.to_json(entity.as_ref(), flavor)
            }
            .map_err(|e| e.to_string())?;
            println!("{}", json);
        }
        None => {
            let entities = store.entities_of(&class).map_err(|e| e.to_string())?;
            let stdout = std::io::stdout();
            let mut writer = NdjsonWriter::new(stdout.lock());
            let count = writer
                .write_all(&serializer, &entities, &flavor)
                .map_err(|e| e.to_string())?;
            writer.flush().map_err(|e| e.to_string())?;
            tracing::info!("Rendered {} {} record(s) with flavor '{}'", count, class, flavor);
        }
    }

    Ok(())
}
