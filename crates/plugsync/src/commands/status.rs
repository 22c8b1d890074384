//! Status command

use anyhow::{Context as _, Result};
use plugsync_update::InstallState;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::{display_hash, Context, GlobalOptions};
use crate::cli::StatusArgs;
use crate::output;

#[derive(Tabled, Serialize)]
struct StatusRow {
    repository: String,
    revision: String,
    folder: String,
    #[tabled(rename = "shared")]
    shared_active: bool,
    updated: String,
}

/// List install records from the state file
pub fn run(args: StatusArgs, global: &GlobalOptions) -> Result<()> {
    let ctx = Context::load(global)?;
    let state = InstallState::new(ctx.store.clone());

    let records = state.records().context("Failed to read install records")?;
    let shared = state.shared_active().context("Failed to read shared flags")?;

    let rows: Vec<StatusRow> = records
        .into_iter()
        .map(|(repository, record)| {
            let missing = !record.folder.is_empty() && !record.folder_exists();
            StatusRow {
                shared_active: shared.get(&repository).copied().unwrap_or(false),
                repository,
                revision: display_hash(Some(record.hash.as_str())),
                folder: match (record.folder.is_empty(), missing) {
                    (true, _) => "-".to_string(),
                    (false, true) => format!("{} (missing)", record.folder),
                    (false, false) => record.folder,
                },
                updated: record
                    .updated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        output::info("No plugins installed yet");
        return Ok(());
    }

    let mut table = Table::new(&rows);
    table.with(Style::sharp());
    println!("{}", table);

    Ok(())
}
