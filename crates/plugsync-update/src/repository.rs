//! Repository coordinates

use crate::error::{Result, UpdateError};
use std::fmt;

/// A code-hosting repository, `owner/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Create a repository reference
    ///
    /// `owner` may carry the combined `owner/name` form, in which case its
    /// name part wins over `name`.
    pub fn new(owner: &str, name: &str) -> Result<Self> {
        let (owner, name) = match owner.trim().split_once('/') {
            Some((owner, combined)) => (owner, combined),
            None => (owner, name),
        };

        let owner = require_non_empty("owner", owner)?;
        let name = require_non_empty("name", name)?;

        Ok(Self { owner, name })
    }

    /// Parse `owner/name`
    pub fn parse(coordinate: &str) -> Result<Self> {
        match coordinate.trim().split_once('/') {
            Some((owner, name)) => Self::new(owner, name),
            None => Err(UpdateError::validation(
                "repository",
                format!("expected 'owner/name', got '{}'", coordinate),
            )),
        }
    }

    /// Repository owner
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of this repository in the install-record mapping
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Prefix of the folder the archive service unpacks to (`owner-name`)
    pub fn folder_prefix(&self) -> String {
        format!(
            "{}-{}",
            normalize_segment(&self.owner),
            normalize_segment(&self.name)
        )
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Trimmed, non-empty string or a validation error naming `field`
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(UpdateError::validation(field, "must be a non-empty string"));
    }
    Ok(value.to_string())
}

fn normalize_segment(segment: &str) -> String {
    segment.replace([' ', '.', '_'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_owner_is_split() {
        let repo = RepositoryRef::new("octo/widget", "ignored").unwrap();
        assert_eq!(repo.owner(), "octo");
        assert_eq!(repo.name(), "widget");
        assert_eq!(repo.key(), "octo/widget");
    }

    #[test]
    fn test_separate_owner_and_name() {
        let repo = RepositoryRef::new(" octo ", " widget ").unwrap();
        assert_eq!(repo.to_string(), "octo/widget");
    }

    #[test]
    fn test_empty_parts_rejected() {
        assert!(matches!(
            RepositoryRef::new("", "widget"),
            Err(UpdateError::Validation { .. })
        ));
        assert!(RepositoryRef::new("octo", "  ").is_err());
        assert!(RepositoryRef::new("octo/", "widget").is_err());
        assert!(RepositoryRef::parse("octo").is_err());
    }

    #[test]
    fn test_folder_prefix_normalization() {
        let repo = RepositoryRef::new("my_org", "site.tools plugin").unwrap();
        assert_eq!(repo.folder_prefix(), "my-org-site-tools-plugin");
    }
}
