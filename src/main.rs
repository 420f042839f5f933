use bytes::Bytes;
use clap::{Parser, Subcommand};
use cos_storage::storage::{CosStorage, Storage, StorageSettings, StorageTimestamp};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cos-storage", about = "Browse and edit a COS bucket through the storage adapter")]
struct Cli {
    /// JSON settings file (bucket, root_path, options, ...)
    #[arg(short, long, value_name = "FILE", env = "COS_STORAGE_SETTINGS")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List directories and files under a path
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Show size and modification time
    Stat { name: String },
    /// Write a file's content to stdout
    Cat { name: String },
    /// Print the public URL of a file
    Url { name: String },
    /// Upload a local file
    Put {
        /// Local file to upload
        #[arg(value_name = "LOCAL")]
        source: PathBuf,

        /// Destination name
        name: String,

        /// Pick a free name instead of overwriting
        #[arg(short, long)]
        keep: bool,

        /// Maximum length of a picked name
        #[arg(long, requires = "keep")]
        max_length: Option<usize>,
    },
    /// Delete a file
    Rm { name: String },
    /// Check whether a file exists
    Exists { name: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = StorageSettings::from_json_file(&cli.settings)?;
    let storage = CosStorage::from_settings(settings)?;
    run(&storage, cli.command).await
}

/// Execute one command; `exists` on a missing name exits with failure.
async fn run(
    storage: &CosStorage,
    command: Commands,
) -> Result<ExitCode, Box<dyn Error + Send + Sync>> {
    match command {
        Commands::Ls { path } => {
            let (directories, files) = storage.listdir(&path).await?;
            for directory in directories {
                println!("{}", directory);
            }
            for file in files {
                println!("{}", file);
            }
        }
        Commands::Stat { name } => {
            let size = storage.size(&name).await?;
            let modified = match storage.get_modified_time(&name).await? {
                StorageTimestamp::Aware(dt) => dt.to_rfc3339(),
                StorageTimestamp::Naive(dt) => dt.to_string(),
            };
            println!("size: {}\nmodified: {}", size, modified);
        }
        Commands::Cat { name } => {
            let mut file = storage.open(&name)?;
            let content = file.read_all().await?;
            std::io::stdout().write_all(&content)?;
        }
        Commands::Url { name } => {
            println!("{}", storage.url(&name)?);
        }
        Commands::Put {
            source,
            name,
            keep,
            max_length,
        } => {
            let content = Bytes::from(tokio::fs::read(&source).await?);
            let name = if keep {
                storage.get_available_name(&name, max_length).await?
            } else {
                name
            };
            let saved = storage.save(&name, content).await?;
            info!("Uploaded {} as {}", source.display(), saved);
            println!("{}", saved);
        }
        Commands::Rm { name } => {
            storage.delete(&name).await?;
        }
        Commands::Exists { name } => {
            let exists = storage.exists(&name).await?;
            println!("{}", exists);
            if !exists {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
