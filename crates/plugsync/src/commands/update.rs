//! Update command

use anyhow::Result;
use plugsync_update::checker::short_hash;
use plugsync_update::UpdateOutcome;

use super::{batch_failure, display_hash, Context, GlobalOptions};
use crate::cli::UpdateArgs;
use crate::output;

/// Run an update cycle for each selected plugin
///
/// Every plugin is attempted; the command fails afterwards if any cycle did.
pub async fn run(args: UpdateArgs, global: &GlobalOptions) -> Result<()> {
    let ctx = Context::load(global)?;
    let plugins = ctx.selected(args.repository.as_deref())?;

    if plugins.is_empty() {
        output::warning("No plugins are tracked");
        return Ok(());
    }

    let mut failed = 0;
    for plugin in &plugins {
        let repository = plugin.key().unwrap_or_else(|_| plugin.repository.clone());

        let result = match ctx.tracked_updater(plugin, args.force) {
            Ok(updater) => updater.run().await.map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => report(&repository, &outcome),
            Err(e) => {
                failed += 1;
                output::error(&format!("{}: {:#}", repository, e));
            }
        }
    }

    batch_failure(failed, plugins.len(), "updates")
}

/// Print the outcome of one cycle
pub(super) fn report(repository: &str, outcome: &UpdateOutcome) {
    match outcome {
        UpdateOutcome::UpToDate { revision } => {
            output::info(&format!("{} is up to date ({})", repository, short_hash(revision)));
        }
        UpdateOutcome::UpdateAvailable { revision, installed } => {
            output::warning(&format!(
                "{}: update available {} -> {} (auto-update disabled, use --force)",
                repository,
                display_hash(installed.as_deref()),
                short_hash(revision)
            ));
        }
        UpdateOutcome::Installed {
            revision,
            previous,
            plugin,
        } => {
            output::success(&format!(
                "{}: installed {} {} ({} -> {})",
                repository,
                plugin.manifest.name,
                plugin.manifest.version,
                display_hash(previous.as_deref()),
                short_hash(revision)
            ));
        }
    }
}
