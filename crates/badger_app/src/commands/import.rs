//! Import command - upload a CSV file and import it into segments.

use std::path::PathBuf;

use anyhow::{Context, Result};
use badger_engine::{DashboardClient, ImportRequest};
use clap::Args;

/// Arguments for the import command.
#[derive(Debug, Args)]
pub struct ImportArgs {
    /// CSV file to import.
    pub file: PathBuf,

    /// Segment id to add the subscribers to. Repeatable.
    #[arg(long = "segment")]
    pub segments: Vec<u64>,

    #[arg(long, default_value = "text/csv")]
    pub content_type: String,
}

/// Execute the import command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any import step fails.
pub async fn execute(client: &DashboardClient, args: ImportArgs) -> Result<()> {
    let contents = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .context("import file needs a UTF-8 file name")?
        .to_string();

    let message = client
        .importer()
        .import(ImportRequest {
            filename,
            content_type: args.content_type,
            contents: contents.into(),
            segments: args.segments,
        })
        .await?;
    println!("{message}");
    Ok(())
}
