use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use doc_enumerable::config::Config;
use doc_enumerable::db::{Database, DocumentStore};
use doc_enumerable::render;

#[derive(Parser)]
#[command(name = "docenum")]
#[command(about = "Inspect and drive enumerable attributes of document models")]
struct Cli {
    /// Model declarations (JSON). Defaults to the user config directory.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Document database file. Defaults to the user data directory.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the document database
    Migrate,
    /// Show the members and scopes generated for a model (all models if omitted)
    Describe { model: Option<String> },
    /// Insert a new document with declared defaults applied
    Create {
        model: String,
        /// Field assignment, `field=value`; repeatable
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },
    /// Invoke a generated member such as `completed!` or `completed?`
    Call {
        model: String,
        id: Uuid,
        member: String,
    },
    /// List the documents selected by a scope
    Scope { model: String, name: String },
    /// Print the declared values of a field (`all_<field>`)
    Values { model: String, field: String },
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected field=value, got `{s}`"))
}

/// Logs go to stderr so stdout only carries command output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "doc_enumerable=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(cli_path: Option<PathBuf>, config: &Config) -> anyhow::Result<Database> {
    let db = match cli_path.or_else(|| config.database_path.clone()) {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let registry = config.build_registry()?;

    match cli.command {
        Commands::Migrate => {
            open_database(cli.db, &config)?;
            tracing::info!("Database is up to date");
        }
        Commands::Describe { model } => match model {
            Some(name) => print!("{}", render::render_model(registry.require(&name)?)),
            None => {
                for model in registry.models() {
                    print!("{}", render::render_model(model));
                }
            }
        },
        Commands::Create { model, set } => {
            let model = registry.require(&model)?;
            let db = open_database(cli.db, &config)?;

            let mut document = model.new_document();
            for (field, value) in set {
                document.set(field, value);
            }
            db.save(&document)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Call { model, id, member } => {
            let model = registry.require(&model)?;
            let db = open_database(cli.db, &config)?;

            let mut document = db
                .get_document(id)?
                .with_context(|| format!("Document {id} not found"))?;
            if !model.owns(&document) {
                anyhow::bail!(
                    "Document {id} is a {} in {}, not a {}",
                    document.model,
                    document.collection,
                    model.name()
                );
            }
            let output = model.call(&db, &mut document, &member)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Scope { model, name } => {
            let model_ref = registry.require(&model)?;
            let criteria = model_ref
                .scope(&name)
                .with_context(|| format!("undefined scope `{name}` for {model}"))?;
            let db = open_database(cli.db, &config)?;

            let documents = db.find(&criteria)?;
            println!("{}", serde_json::to_string_pretty(&documents)?);
        }
        Commands::Values { model, field } => {
            let model_ref = registry.require(&model)?;
            let values = model_ref
                .introspect(&format!("all_{field}"))
                .with_context(|| format!("{model} has no enumerable `{field}`"))?;
            let values: Vec<Value> = values.iter().cloned().map(Value::String).collect();
            let mut out = Map::new();
            out.insert(format!("all_{field}"), Value::Array(values));
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
