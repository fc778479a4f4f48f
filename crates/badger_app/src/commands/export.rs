//! Export command - trigger a subscribers export and wait for its download URL.

use anyhow::{Context, Result};
use badger_engine::{DashboardClient, PollError, PollerSettings};
use badger_logging::badger_info;

/// Execute the export command.
///
/// # Errors
///
/// Returns an error if the export fails, runs out of retries or is interrupted.
pub async fn execute(client: &DashboardClient, settings: PollerSettings) -> Result<()> {
    badger_info!(
        "Starting export (interval {:?}, retry budget {})",
        settings.interval,
        settings.retry_budget
    );
    let poller = client.export_poller(settings);
    let ticket = poller.trigger();
    let canceller = ticket.canceller();
    let mut progress = ticket.watch();

    let outcome = tokio::select! {
        outcome = ticket.outcome() => outcome,
        _ = tokio::signal::ctrl_c() => {
            canceller.cancel();
            Err(PollError::Cancelled)
        }
    };

    let job = progress.borrow_and_update().clone();
    match outcome {
        Ok(url) => {
            println!("{url}");
            Ok(())
        }
        Err(err) => Err(err).with_context(|| {
            format!(
                "export did not complete after {} status checks",
                job.attempts_settled()
            )
        }),
    }
}
