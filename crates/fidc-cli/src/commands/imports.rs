//! `fidc imports` command implementations

use crate::api::{ApiClient, ListQuery};
use crate::commands::display;
use crate::detail::DetailView;
use crate::error::{FingerprintError, Result};
use crate::poller::{ImportListView, ListSnapshot, PollerState};
use crate::progress::{create_spinner, format_bytes};
use crate::reprocess::{ReprocessController, ReprocessPolicy};
use crate::submission::{SelectedFile, SubmissionController, SubmissionForm};
use crate::OutputFormat;
use colored::Colorize;
use fidc_common::fingerprint::verify_fingerprint;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Upload a file and print the new import id
pub async fn submit(
    client: &ApiClient,
    path: &Path,
    mut form: SubmissionForm,
    format: OutputFormat,
) -> Result<()> {
    let file = SelectedFile::from_path(path).await?;
    let message = format!("Uploading {} ({})", file.name(), format_bytes(file.len() as u64));
    form.file = Some(file);

    // Reject before showing a spinner for a request that never happens.
    form.validate()?;

    let spinner = create_spinner(&message);
    let result = SubmissionController::new(client.clone()).submit(&mut form).await;
    spinner.finish_and_clear();
    let receipt = result?;

    match format {
        OutputFormat::Json => {
            let body = json!({
                "importacaoId": receipt.import_id,
                "fileName": receipt.file_name,
                "fileHash": receipt.file_hash,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        },
        OutputFormat::Table => {
            println!(
                "{} Import {} created for {}",
                "✓".green(),
                receipt.import_id.bold(),
                receipt.file_name
            );
            match (&receipt.file_hash, &receipt.fingerprint_error) {
                (Some(hash), _) => println!("  Fingerprint: {}", hash.dimmed()),
                (None, Some(e)) => {
                    println!("  {} Sent without fingerprint: {}", "⚠".yellow(), e)
                },
                (None, None) => {},
            }
            println!();
            println!("Follow it with: fidc imports show {}", receipt.import_id);
        },
    }

    Ok(())
}

fn print_snapshot(snapshot: &ListSnapshot, poll_interval: Duration, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&snapshot.page)?);
        },
        OutputFormat::Table => {
            if snapshot.page.items.is_empty() {
                println!("{}", "No imports found.".yellow());
            } else {
                println!();
                println!("{}", display::import_table(&snapshot.page.items));
            }
            println!("{}", display::list_footer(snapshot, poll_interval));
        },
    }
    Ok(())
}

/// List one page of imports
///
/// With `watch`, snapshots keep printing while anything on the page is still
/// running, until every import finishes or Ctrl+C is pressed.
pub async fn list(
    client: &ApiClient,
    query: ListQuery,
    poll_interval: Duration,
    watch: bool,
    format: OutputFormat,
) -> Result<()> {
    let view = ImportListView::new(client.clone(), query, poll_interval);
    let mut updates = view.subscribe();

    let first = view.refresh().await?;
    let _ = updates.borrow_and_update();

    let Some(first) = first else {
        return Ok(());
    };
    print_snapshot(&first, poll_interval, format)?;

    if watch && first.state == PollerState::Polling {
        info!(interval_secs = poll_interval.as_secs(), "Watching imports");

        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let latest = updates.borrow_and_update().clone();
                    if let Some(snapshot) = latest {
                        print_snapshot(&snapshot, poll_interval, format)?;
                        if snapshot.state == PollerState::Idle {
                            break;
                        }
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    debug!("Interrupted, stopping watch");
                    break;
                },
            }
        }
    }

    view.shutdown().await;
    Ok(())
}

/// Show one import with its event timeline
pub async fn show(
    client: &ApiClient,
    import_id: &str,
    verify: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let detail = DetailView::new(client.clone(), import_id).load().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&detail.job)?),
        OutputFormat::Table => {
            println!("{}", display::detail_table(&detail));
            println!();
            if detail.job.events.is_empty() {
                println!("{}", "No events recorded yet.".dimmed());
            } else {
                println!("{}", "Events".cyan().bold());
                println!("{}", display::timeline_table(&detail));
            }
        },
    }

    if let Some(path) = verify {
        let file = SelectedFile::from_path(path).await?;
        let Some(expected) = detail.job.file_hash.as_deref() else {
            println!(
                "{} The service has no fingerprint for this import; nothing to compare.",
                "⚠".yellow()
            );
            return Ok(());
        };

        let contents = file.contents();
        let expected = expected.to_string();
        tokio::task::spawn_blocking(move || verify_fingerprint(&contents, &expected))
            .await
            .map_err(|e| FingerprintError::new(file.name(), e.to_string()))??;

        println!("{} {} matches the uploaded file", "✓".green(), file.name());
    }

    Ok(())
}

/// Request a new attempt and print the refreshed snapshot
pub async fn reprocess(
    client: &ApiClient,
    import_id: &str,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let policy = if force {
        ReprocessPolicy::Force
    } else {
        ReprocessPolicy::TerminalOnly
    };

    let outcome = ReprocessController::new(client.clone())
        .with_policy(policy)
        .reprocess(import_id)
        .await?;

    match format {
        OutputFormat::Json => {
            let body = json!({
                "importacaoId": outcome.import_id,
                "before": outcome.before,
                "after": outcome.after,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        },
        OutputFormat::Table => {
            println!(
                "{} Reprocess requested for {}",
                "✓".green(),
                outcome.import_id.bold()
            );
            match &outcome.after {
                Some(after) => println!(
                    "  Status: {} → {} · attempts: {} → {}",
                    outcome.before.status, after.status, outcome.before.tentativas, after.tentativas
                ),
                None => println!(
                    "  {} Could not read the import back; run 'fidc imports show {}'",
                    "⚠".yellow(),
                    outcome.import_id
                ),
            }
            if outcome.after.is_some() && !outcome.attempt_recorded() {
                println!("  {}", "The new attempt is not visible yet.".dimmed());
            }
        },
    }

    Ok(())
}
