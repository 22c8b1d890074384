//! Check command

use anyhow::{Context as _, Result};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::{batch_failure, display_hash, Context, GlobalOptions};
use crate::cli::CheckArgs;
use crate::output;

#[derive(Tabled, Serialize)]
struct CheckRow {
    repository: String,
    installed: String,
    latest: String,
    status: String,
}

/// Report which tracked plugins have a newer revision
///
/// Supports:
/// - Check all: `plugsync check`
/// - Check one: `plugsync check octo/widget`
/// - JSON output: `plugsync check --json`
pub async fn run(args: CheckArgs, global: &GlobalOptions) -> Result<()> {
    let ctx = Context::load(global)?;
    let plugins = ctx.selected(args.repository.as_deref())?;

    if plugins.is_empty() {
        output::warning("No plugins are tracked");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(plugins.len());
    let mut failed = 0;
    let spinner = output::spinner("Checking for updates...", ctx.quiet || args.json);

    for plugin in &plugins {
        let repository = plugin.key().unwrap_or_else(|_| plugin.repository.clone());
        spinner.set_message(format!("Checking {}", repository));

        let result = match ctx.tracked_updater(plugin, false) {
            Ok(updater) => updater.check().await.map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };

        let row = match result {
            Ok(check) => CheckRow {
                repository,
                installed: display_hash(check.previous.as_ref().map(|r| r.hash.as_str())),
                latest: display_hash(Some(check.revision.as_str())),
                status: if check.has_update {
                    "update available".to_string()
                } else {
                    "up to date".to_string()
                },
            },
            Err(e) => {
                failed += 1;
                CheckRow {
                    repository,
                    installed: "-".to_string(),
                    latest: "-".to_string(),
                    status: format!("error: {}", e),
                }
            }
        };
        rows.push(row);
    }

    spinner.finish_and_clear();

    if args.json {
        let json = serde_json::to_string_pretty(&rows).context("Failed to serialize to JSON")?;
        println!("{}", json);
    } else {
        let mut table = Table::new(&rows);
        table.with(Style::sharp());
        println!("\n{}", table);

        let available = rows.iter().filter(|r| r.status == "update available").count();
        if available > 0 {
            output::info(&format!("{} update(s) available", available));
        } else if failed == 0 {
            output::success("All plugins are up to date");
        }
    }

    batch_failure(failed, rows.len(), "checks")
}
