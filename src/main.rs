//! Qremis CLI - serve and inspect a linked archival-metadata record store

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use qremis::config::{self, ServiceConfig};
use qremis::pagination::clamp_limit;
use qremis::storage::open_backend;
use qremis::{record, ui, Cursor, RecordKind, StorageBackend};

#[derive(Parser)]
#[command(name = "qremis")]
#[command(version)]
#[command(about = "Linked archival-metadata record store with an HTTP API")]
#[command(long_about = r#"
Qremis stores object, event, agent, rights and relationship records and the
links between them, over Redis, SQLite or an in-process store.

Example usage:
  qremis init
  qremis serve --port 8910
  qremis list object --limit 50
  qremis show 0f6c2a1e4b7d4a3c9e8f1a2b3c4d5e6f
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./qremis.toml)
    #[arg(short, long, global = true, env = "QREMIS_API_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Storage backend (overrides storage.backend)
        #[arg(short, long)]
        backend: Option<String>,
    },

    /// Write a starter config file
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// List one page of record identifiers of a kind
    List {
        /// Record kind (object, event, agent, rights, relationship)
        kind: String,

        /// Cursor returned by a previous page
        #[arg(long, default_value = "0")]
        cursor: String,

        /// Page size (capped at pagination.max_limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a record
    Show {
        /// Record identifier
        id: String,

        /// Omit link listings
        #[arg(short, long)]
        sparse: bool,
    },

    /// Count records per kind
    Stats,

    /// Print the version
    Version,
}

fn load(path: Option<&Path>) -> anyhow::Result<ServiceConfig> {
    if let Some(config) = config::load_config(path)? {
        return Ok(config);
    }
    if let Some(path) = path {
        anyhow::bail!("config file not found: {}", path.display());
    }
    ui::warn(&format!(
        "No {} found, using defaults",
        config::default_config_path().display()
    ));
    Ok(ServiceConfig::default())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match cli.command {
        Commands::Init { .. } => ServiceConfig::default(),
        _ => load(cli.config.as_deref())?,
    };
    config.init_logging(cli.verbose);

    match cli.command {
        Commands::Serve { host, port, backend } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if backend.is_some() {
                config.storage.backend = backend;
            }
            let kind = config.validate()?;

            ui::header("Qremis API");
            ui::info("Backend", kind.as_str());
            ui::info("Max page size", &config.pagination.max_limit.to_string());

            let backend = open_backend(&config.storage)?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(qremis::server::start_server(&config, backend))?;
        }

        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            config::write_config(&path, &ServiceConfig::starter(), force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }

        Commands::List { kind, cursor, limit, json } => {
            config.validate()?;
            let kind: RecordKind = kind.parse()?;
            let start: Cursor = cursor.parse()?;
            let limit = clamp_limit(limit, config.pagination.max_limit);

            let backend = open_backend(&config.storage)?;
            let page = backend.list_kind(kind, start, limit)?;

            if json {
                let body = serde_json::json!({
                    "pagination": qremis::pagination::Pagination::new(&cursor, &page, limit),
                    kind.list_segment(): page.ids,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
                return Ok(());
            }

            ui::section(&format!(" {} ", ui::kind_label(kind)));
            if page.ids.is_empty() {
                println!("{}", ui::muted("No records."));
            } else {
                println!("{}", ui::id_table(kind, &page.ids, 0));
            }
            match page.next {
                Some(next) => ui::info("Next cursor", &next.to_string()),
                None => println!("{}", ui::dim("End of listing.")),
            }
        }

        Commands::Show { id, sparse } => {
            config.validate()?;
            let backend = open_backend(&config.storage)?;
            let kind = backend
                .find_kind(&id)?
                .ok_or_else(|| qremis::Error::IdentifierNotFound(id.clone()))?;

            let value = record::materialize(backend.as_ref(), kind, &id, !sparse)?;
            tracing::debug!("Loaded {} record {}", kind, id);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }

        Commands::Stats => {
            config.validate()?;
            let backend = open_backend(&config.storage)?;

            let mut counts = Vec::new();
            for &kind in RecordKind::all() {
                counts.push((kind, backend.count_kind(kind, config.pagination.max_limit)?));
            }

            println!("{} Qremis Statistics ({})", ui::Icons::STATS, backend.name());
            println!("{}", ui::stats_table(&counts));
        }

        Commands::Version => {
            println!("qremis {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
