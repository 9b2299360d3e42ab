use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use clashvault_core::{
    platform, settings, BackupManager, CredentialStore, Database, GistClient, KeyringCredentials,
    ProgressSink, SettingsFile,
};

/// Clashvault CLI - encrypted Gist backups for Clash profiles and settings
#[derive(Parser)]
#[command(name = "clashvault")]
#[command(about = "Encrypted Gist backups for Clash profiles and settings", long_about = None)]
struct Cli {
    /// Override the application data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the GitHub token and encryption passphrase
    Configure {
        /// Remove both stored secrets instead
        #[arg(long)]
        clear: bool,
    },

    /// Show whether backup is configured
    Status,

    /// Create a new encrypted backup and upload it
    Backup,

    /// List remote backups, newest first
    List,

    /// Restore a backup by gist id
    Restore {
        /// Gist id of the backup to restore
        id: String,
    },

    /// Delete one or more backups by gist id
    Delete {
        /// Gist ids to delete
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();
    let credentials = KeyringCredentials::new();

    match cli.command {
        Commands::Configure { clear } => {
            if clear {
                credentials.clear()?;
                println!("Stored credentials removed.");
                return Ok(());
            }

            let token = rpassword::prompt_password("GitHub token (gist scope): ")
                .context("failed to read token")?;
            if token.trim().is_empty() {
                bail!("token must not be empty");
            }

            let passphrase = rpassword::prompt_password("Encryption passphrase: ")
                .context("failed to read passphrase")?;
            let confirm = rpassword::prompt_password("Confirm passphrase: ")
                .context("failed to read passphrase")?;
            if passphrase != confirm {
                bail!("passphrases do not match");
            }
            if passphrase.trim().is_empty() {
                bail!("passphrase must not be empty");
            }

            credentials.set_github_token(token.trim())?;
            credentials.set_passphrase(&passphrase)?;
            println!("Credentials stored in the system keychain.");
        }

        Commands::Status => {
            if credentials.is_configured()? {
                println!("Backup is configured.");
            } else {
                println!("Backup is not configured. Run `clashvault configure` first.");
            }
        }

        Commands::Backup => {
            let (manager, printer) = build_manager(cli.data_dir)?;
            let result = manager.create_backup().await;
            // Drop the manager so the progress channel closes and the
            // printer task drains before we report the outcome.
            drop(manager);
            printer.await.ok();
            let id = result?;
            println!("Backup created: {id}");
        }

        Commands::List => {
            let (manager, printer) = build_manager(cli.data_dir)?;
            let result = manager.list_backups().await;
            drop(manager);
            printer.await.ok();
            let backups = result?;

            if backups.is_empty() {
                println!("No backups found.");
            } else {
                for backup in backups {
                    println!("{}  {}  {}", backup.id, backup.created_at, backup.description);
                }
            }
        }

        Commands::Restore { id } => {
            let (manager, printer) = build_manager(cli.data_dir)?;
            let result = manager.restore_backup(&id).await;
            drop(manager);
            printer.await.ok();
            result?;
            println!("Backup {id} restored.");
        }

        Commands::Delete { ids } => {
            let (manager, printer) = build_manager(cli.data_dir)?;
            let result = manager.delete_backups(&ids).await;
            drop(manager);
            printer.await.ok();
            let report = result?;
            println!("Deleted {} backup(s), {} failed.", report.deleted, report.failed);
            if report.failed > 0 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Assemble a manager over the real collaborators, with progress events
/// printed as they arrive.
fn build_manager(
    data_dir: Option<PathBuf>,
) -> Result<(BackupManager, tokio::task::JoinHandle<()>)> {
    let data_dir = match data_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => platform::ensure_data_dir().context("failed to create data directory")?,
    };

    let db = Database::open(data_dir.join("profiles.db"))?;
    let service = SettingsFile::open(data_dir.join("service.json"), settings::service_defaults())?;
    let ui = SettingsFile::open(data_dir.join("ui.json"), BTreeMap::new())?;

    let (sink, mut rx) = ProgressSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            println!("  {progress}");
        }
    });

    let manager = BackupManager::new(
        Arc::new(KeyringCredentials::new()),
        Arc::new(GistClient::new()?),
        Arc::new(Mutex::new(db)),
        Arc::new(Mutex::new(service)),
        Arc::new(Mutex::new(ui)),
        platform::profiles_dir(&data_dir),
    )
    .with_progress(sink);

    Ok((manager, printer))
}
