//! List command - print a paginated collection as JSON lines.

use anyhow::{bail, Context, Result};
use badger_engine::api::{list_descriptor, Page};
use badger_engine::{DashboardClient, FetchState, Settled};
use badger_logging::badger_debug;
use clap::Args;

/// Arguments for the list command.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Collection path, e.g. `/api/subscribers`.
    #[arg(default_value = "/api/subscribers")]
    pub collection: String,

    /// Items per page.
    #[arg(long, default_value = "20")]
    pub per_page: u32,

    /// Follow `links.next` for up to this many pages.
    #[arg(long, default_value = "1")]
    pub pages: u32,
}

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if the collection path is invalid or a page cannot be fetched.
pub async fn execute(client: &DashboardClient, args: ListArgs) -> Result<()> {
    let fetcher = client.fetcher(Page::<serde_json::Value>::default());
    let mut descriptor = Some(list_descriptor(&args.collection, args.per_page)?);
    let mut fetched = 0;

    while let Some(next) = descriptor.take() {
        if fetched == args.pages {
            break;
        }
        badger_debug!("Fetching {}", next.target());
        let page = match fetcher.issue(next).settled().await {
            Settled::Observed(FetchState::Success { data }) => data,
            Settled::Observed(FetchState::Error { failure, .. }) => {
                return Err(failure).context("failed to fetch page");
            }
            other => bail!("page fetch did not settle: {other:?}"),
        };
        fetched += 1;

        for item in &page.collection {
            println!("{}", serde_json::to_string(item)?);
        }
        descriptor = page.next_descriptor().transpose()?;
    }
    Ok(())
}
