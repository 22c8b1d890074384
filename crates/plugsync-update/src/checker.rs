//! Revision checks against the repository's commit history

use plugsync_core::types::RuntimeConfig;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Result, UpdateError};
use crate::repository::RepositoryRef;
use crate::store::{InstallRecord, InstallState};

/// Commit entry; only the hash is used
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub sha: String,
}

/// Commit-list payload: a commit array or an error object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommitsResponse {
    Commits(Vec<Commit>),
    Error { message: String },
}

/// Result of a revision check
#[derive(Debug, Clone)]
pub struct UpdateCheck {
    /// Whether a (re)install is required
    pub has_update: bool,

    /// Newest upstream revision
    pub revision: String,

    /// Record loaded before the check, if the repository was known
    pub previous: Option<InstallRecord>,
}

/// Whether `revision` must be installed given the stored record
///
/// True for a repository never recorded, a changed hash, or a recorded
/// folder that has been removed from disk.
pub fn needs_update(previous: Option<&InstallRecord>, revision: &str) -> bool {
    match previous {
        None => true,
        Some(record) => record.hash != revision || !record.folder_exists(),
    }
}

/// Queries the commit-list endpoint
pub struct VersionChecker {
    client: reqwest::Client,
    api_url: String,
}

impl VersionChecker {
    /// Create a checker from runtime configuration
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.network.user_agent)
            .connect_timeout(Duration::from_secs(config.network.connect_timeout_secs))
            .timeout(Duration::from_secs(config.network.http_timeout_secs))
            .build()?;

        Ok(Self::with_client(client, &config.github.api_url))
    }

    /// Create a checker with a prepared client
    pub fn with_client(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn commits_url(&self, repo: &RepositoryRef, token: Option<&str>) -> Result<Url> {
        let raw = format!("{}/{}/{}/commits", self.api_url, repo.owner(), repo.name());
        let mut url = Url::parse(&raw)
            .map_err(|e| UpdateError::validation("api-url", format!("{}: {}", raw, e)))?;
        if let Some(token) = token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        Ok(url)
    }

    /// Hash of the newest commit on the repository
    pub async fn latest_revision(
        &self,
        repo: &RepositoryRef,
        token: Option<&str>,
    ) -> Result<String> {
        let url = self.commits_url(repo, token)?;
        debug!("Fetching commit list for {}", repo);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<CommitsResponse>(&body) {
            Ok(CommitsResponse::Commits(commits)) => commits
                .into_iter()
                .next()
                .map(|commit| commit.sha)
                .ok_or_else(|| UpdateError::upstream(repo.key(), "repository has no commits")),
            Ok(CommitsResponse::Error { message }) => {
                if message.trim().eq_ignore_ascii_case("not found") {
                    Err(UpdateError::RepositoryNotFound {
                        repository: repo.key(),
                    })
                } else {
                    Err(UpdateError::upstream(repo.key(), message))
                }
            }
            Err(_) if !status.is_success() => {
                Err(UpdateError::upstream(repo.key(), status.to_string()))
            }
            Err(e) => Err(UpdateError::upstream(
                repo.key(),
                format!("unexpected commit list payload: {}", e),
            )),
        }
    }

    /// Compare the newest revision against the stored install record
    ///
    /// A repository seen for the first time gets a placeholder record so a
    /// failure later in the cycle does not lose track of it.
    pub async fn check_for_update(
        &self,
        repo: &RepositoryRef,
        token: Option<&str>,
        state: &InstallState,
    ) -> Result<UpdateCheck> {
        let previous = state.record(&repo.key())?;
        let revision = self.latest_revision(repo, token).await?;

        if previous.is_none() {
            debug!("First sighting of {}, storing placeholder record", repo);
            state.upsert_record(&repo.key(), InstallRecord::placeholder())?;
        }

        let has_update = needs_update(previous.as_ref(), &revision);
        if has_update {
            info!("Update available for {}: {}", repo, short_hash(&revision));
        } else {
            debug!("{} is up to date at {}", repo, short_hash(&revision));
        }

        Ok(UpdateCheck {
            has_update,
            revision,
            previous,
        })
    }
}

/// First seven characters of a revision hash
pub fn short_hash(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}
