//! drive_mirror CLI - Mirror Google Drive content to local disk.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drive_mirror::models::format_size;
use drive_mirror::mirror::{self, Outcome};
use drive_mirror::{Authenticator, DriveClient};

/// CLI tool for mirroring Google Drive folders and files.
#[derive(Parser)]
#[command(name = "drive_mirror")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to service account JSON credentials file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the immediate children of a folder.
    Ls {
        /// Folder (or file) URL or ID.
        reference: String,
    },

    /// Copy a file or folder tree to the local filesystem.
    Cp {
        /// Drive folder or file URL or ID.
        source: String,

        /// Local destination directory.
        destination: PathBuf,

        /// Descend into subfolders.
        #[arg(short, long)]
        recursive: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let auth = Authenticator::from_file(&cli.credentials)
        .with_context(|| format!("Failed to load credentials from {:?}", cli.credentials))?;
    let client = DriveClient::new(auth);

    match cli.command {
        Commands::Ls { reference } => {
            let entries = mirror::list(&client, &reference)
                .await
                .with_context(|| format!("Failed to list: {}", reference))?;

            if entries.is_empty() {
                println!("No files found.");
            } else {
                println!("{:<44} {:>10} {:<8} {}", "ID", "SIZE", "KIND", "NAME");
                println!("{}", "-".repeat(90));
                for entry in entries {
                    let size = entry.size.map(format_size).unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<44} {:>10} {:<8} {}",
                        entry.id,
                        size,
                        entry.kind.as_str(),
                        entry.name
                    );
                }
            }
        }

        Commands::Cp {
            source,
            destination,
            recursive,
        } => {
            let report = mirror::copy(&client, &source, &destination, recursive)
                .await
                .with_context(|| format!("Failed to copy: {}", source))?;

            for item in &report.items {
                match &item.outcome {
                    Outcome::Copied { bytes, .. } => {
                        println!("{}  OK ({})", item.path, format_size(*bytes));
                    }
                    Outcome::Failed(error) => {
                        println!("{}  FAILED", item.path);
                        eprintln!("  Error: {}", error);
                    }
                    Outcome::SkippedCycle => {
                        println!("{}  SKIPPED (already visited)", item.path);
                    }
                }
            }

            println!("{} copied, {} failed.", report.copied(), report.failed());

            if !report.ok() {
                anyhow::bail!("{} item(s) failed", report.failed());
            }
        }
    }

    Ok(())
}
