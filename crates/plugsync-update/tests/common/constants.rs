//! Shared test constants

/// Repository owner used across tests
pub const OWNER: &str = "octo";

/// Repository name used across tests
pub const NAME: &str = "widget";

/// `owner/name` key
pub const REPO_KEY: &str = "octo/widget";

/// Revision hashes
pub const SHA_V1: &str = "1111111aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const SHA_V2: &str = "2222222bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

/// Plugin name declared by the default test archive
pub const PLUGIN_NAME: &str = "My Widget";

/// Canonical folder name for [`PLUGIN_NAME`]
pub const PLUGIN_SLUG: &str = "my-widget";

/// Manifest-bearing file of the default test archive
pub const PLUGIN_FILE: &str = "widget.php";

/// Host plugin id of the default test archive
pub const PLUGIN_ID: &str = "my-widget/widget.php";

/// Access token used in auth tests
pub const TOKEN: &str = "t0k3n";

/// Folder an archive service would produce for `octo/widget` at `sha`
pub fn archive_folder(sha: &str) -> String {
    format!("{}-{}-{}", OWNER, NAME, &sha[..7])
}

/// PHP entry file carrying a plugin header
pub fn plugin_header(name: &str, version: &str) -> String {
    format!(
        "<?php\n/**\n * Plugin Name: {}\n * Version: {}\n * Author: Octo\n */\n",
        name, version
    )
}
