//! Install command

use anyhow::{Context as _, Result};
use plugsync_update::{RepositoryRef, UpdateOutcome, UpdaterOptions};

use super::{Context, GlobalOptions};
use crate::cli::InstallArgs;
use crate::output;

/// Install a repository that is not listed in plugins.yaml
///
/// The install is recorded like any other, so later runs of this command
/// only download again when the repository has moved on.
pub async fn run(args: InstallArgs, global: &GlobalOptions) -> Result<()> {
    let ctx = Context::load(global)?;

    let repo = RepositoryRef::parse(&args.repository)?;

    let mut options = UpdaterOptions::new();
    options.set_repository_owner(repo.owner())?;
    options.set_repository_name(repo.name())?;
    options.set_destination(args.destination.as_std_path())?;
    options.set_scope(args.scope);
    options.set_auto_run(true);
    if let Some(token) = args.token.as_deref().or(ctx.runtime.github.token.as_deref()) {
        options.set_access_token(token)?;
    }

    let updater = ctx.updater(options)?;
    let repository = repo.key();

    let outcome = updater
        .run()
        .await
        .with_context(|| format!("Failed to install {}", repository))?;

    super::update::report(&repository, &outcome);

    if let UpdateOutcome::Installed { plugin, .. } = &outcome {
        output::header("Installed plugin");
        output::kv("Plugin id", &plugin.plugin_id());
        output::kv("Folder", &plugin.folder.display().to_string());
        output::kv("Scope", &plugin.scope.to_string());
        if let Some(linker) = &plugin.linker {
            output::kv("Linker", &linker.display().to_string());
        }
    }

    Ok(())
}
