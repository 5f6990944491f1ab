//! Volunteer Matrix - committee/program assignment grid
//!
//! Runs the flat-file data service and offers command-line access to the
//! roster: backups, restores and a text rendering of the grid.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use volunteer_matrix::{
    api::build_app,
    backup::{self, ExportDocument},
    config::AppConfig,
    roster::{MatrixColumn, PersonSort, RosterStore},
    server::{DataState, FileStore},
    sync::{HttpDataService, Synchronizer},
};

#[derive(Parser)]
#[command(name = "volunteer-matrix")]
#[command(version)]
#[command(about = "Volunteer assignment grid and its data service")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "VOLUNTEER_MATRIX_CONFIG")]
    config: Option<PathBuf>,

    /// Data service endpoint (overrides sync.api_url)
    #[arg(long, env = "VOLUNTEER_MATRIX_API")]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the data service
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long, env = "PORT")]
        port: Option<u16>,

        /// JSON data file
        #[arg(long, env = "DATA_FILE")]
        data_file: Option<PathBuf>,
    },

    /// Write a backup of the current roster
    Export {
        /// Output path (default: volunteer-backup-<date>.json)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace the roster with a backup file
    Import {
        /// Backup file to restore
        file: PathBuf,
    },

    /// Print the assignment grid and the person bank
    Summary {
        /// Fuzzy filter for the person bank
        #[arg(short, long, default_value = "")]
        search: String,

        /// Person bank order
        #[arg(long, default_value = "name-asc")]
        sort: PersonSort,

        /// Show every program of this group (repeatable)
        #[arg(long)]
        expand: Vec<String>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("volunteer_matrix={},tower_http={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        config.sync.api_url = api_url;
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_file,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(data_file) = data_file {
                config.storage.data_file = data_file;
            }
            run_server(config).await?;
        }
        Commands::Export { out } => {
            run_export(&config, out).await?;
        }
        Commands::Import { file } => {
            run_import(&config, &file).await?;
        }
        Commands::Summary {
            search,
            sort,
            expand,
        } => {
            run_summary(&config, &search, sort, &expand).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    let store = Arc::new(FileStore::open(&config.storage.data_file).await?);
    tracing::info!("Serving data file {}", store.path().display());

    let app = build_app(DataState { store }, &config.server.cors_origins);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Data service running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down...");
}

/// Store wired to the configured data service
fn connect(config: &AppConfig) -> Result<RosterStore> {
    let service = HttpDataService::new(&config.sync.api_url, config.sync.request_timeout())?;
    let sync = Synchronizer::spawn(Arc::new(service), config.sync.debounce());
    Ok(RosterStore::with_sync(sync).with_admin_password(config.admin.password.clone()))
}

async fn run_export(config: &AppConfig, out: Option<PathBuf>) -> Result<()> {
    let mut store = connect(config)?;
    store.load().await?;

    let doc = ExportDocument::from_store(&store);
    let path = out.unwrap_or_else(|| PathBuf::from(doc.file_name()));
    tokio::fs::write(&path, doc.to_pretty_json()?).await?;

    println!(
        "Exported {} people, {} committees, {} programs, {} assignments to {}",
        store.people().len(),
        store.committees().len(),
        store.programs().len(),
        store.assignments().len(),
        path.display()
    );
    Ok(())
}

async fn run_import(config: &AppConfig, file: &std::path::Path) -> Result<()> {
    let text = tokio::fs::read_to_string(file).await?;
    let mut store = connect(config)?;
    backup::import_into(&mut store, &text).await?;

    println!(
        "Imported {} people, {} committees, {} programs, {} assignments",
        store.people().len(),
        store.committees().len(),
        store.programs().len(),
        store.assignments().len()
    );
    Ok(())
}

async fn run_summary(
    config: &AppConfig,
    search: &str,
    sort: PersonSort,
    expand: &[String],
) -> Result<()> {
    let mut store = connect(config)?;
    store.load().await?;
    for group in expand {
        if !store.is_group_expanded(group) {
            store.toggle_group(group);
        }
    }

    let columns = store.matrix_columns();
    println!("Columns:");
    for column in &columns {
        match column {
            MatrixColumn::Program { group, program } => {
                println!("  [{}] {}", group, program.name);
            }
            MatrixColumn::CollapsedGroup {
                group,
                program_names,
            } => {
                println!("  [{}] (collapsed: {})", group, program_names.join(", "));
            }
        }
    }

    println!();
    println!("Committees:");
    for committee in store.committees() {
        println!("  {}", committee.name);
        for column in &columns {
            let (label, names) = match column {
                MatrixColumn::Program { program, .. } => {
                    let names: Vec<String> = store
                        .cell_assignments(&committee.id, &program.id)
                        .iter()
                        .filter_map(|a| store.person(&a.person_id))
                        .map(|p| p.nickname.clone())
                        .collect();
                    (program.name.as_str(), names)
                }
                MatrixColumn::CollapsedGroup { group, .. } => {
                    let names: Vec<String> = store
                        .collapsed_group_people(&committee.id, group)
                        .iter()
                        .map(|p| p.nickname.clone())
                        .collect();
                    (group.as_str(), names)
                }
            };
            if !names.is_empty() {
                println!("    {}: {}", label, names.join(", "));
            }
        }
    }

    println!();
    println!("People ({}):", sort);
    for person in store.search_people(search, sort) {
        println!(
            "  {:<16} {:<24} {:<28} {:>3}  {}",
            person.nickname,
            person.full_name,
            person.email,
            store.assignment_count(&person.id),
            person.color()
        );
    }

    Ok(())
}

fn show_config(config: Option<&AppConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
