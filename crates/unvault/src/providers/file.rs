//! Password file secret provider

use super::{SecretProvider, identity_from_material, identity_id};
use crate::error::ProviderError;
use crate::identity::SecretIdentity;
use crate::ProviderConfig;
use async_trait::async_trait;
use std::path::PathBuf;

/// Loads one identity from the contents of a file.
///
/// Surrounding whitespace is stripped. The file is only ever read, never
/// executed, whatever its permissions; use [`ExecProvider`](super::ExecProvider)
/// for password scripts.
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
    id: String,
}

impl FileProvider {
    /// Create a provider reading `path` as identity `id`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: id.into(),
        }
    }

    /// Build from a configuration entry (`path` required, `id` optional)
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] when `path` is missing or `id`
    /// is not a valid identity id.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(config.require("path")?, identity_id(config)?))
    }
}

#[async_trait]
impl SecretProvider for FileProvider {
    fn provider_name(&self) -> &'static str {
        "file"
    }

    async fn load_identities(&self) -> Result<Vec<SecretIdentity>, ProviderError> {
        let content = tokio::fs::read(&self.path).await.map_err(|e| {
            ProviderError::io(
                self.provider_name(),
                format!("failed to read '{}': {e}", self.path.display()),
            )
        })?;

        tracing::debug!(
            path = %self.path.display(),
            id = %self.id,
            "Loaded vault identity from file"
        );
        Ok(vec![identity_from_material(
            self.provider_name(),
            &self.id,
            content.trim_ascii().to_vec(),
        )?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_load_strips_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault-pass");
        fs::write(&path, "  correct horse\n\n").unwrap();

        let provider = FileProvider::new(&path, "default");
        let identities = provider.load_identities().await.unwrap();
        assert_eq!(identities[0].expose_key(), b"correct horse");
        assert_eq!(identities[0].id(), "default");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let provider = FileProvider::new("/nonexistent/vault-pass", "default");
        let err = provider.load_identities().await.unwrap_err();

        assert_eq!(err.kind(), "io_failure");
        assert!(err.to_string().contains("/nonexistent/vault-pass"));
    }

    #[tokio::test]
    async fn test_whitespace_only_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank");
        fs::write(&path, "\n \n").unwrap();

        let err = FileProvider::new(&path, "default")
            .load_identities()
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_executable_file_is_read_not_run() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script");
        fs::write(&path, "#!/bin/sh\necho from-script\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        let identities = FileProvider::new(&path, "default")
            .load_identities()
            .await
            .unwrap();
        assert_eq!(
            identities[0].expose_key(),
            b"#!/bin/sh\necho from-script"
        );
    }

    #[test]
    fn test_from_config() {
        let provider = FileProvider::from_config(
            &ProviderConfig::new("file")
                .with_param("path", "/etc/vault")
                .with_param("id", "ops"),
        )
        .unwrap();
        assert_eq!(provider.path, PathBuf::from("/etc/vault"));
        assert_eq!(provider.id, "ops");

        assert!(FileProvider::from_config(&ProviderConfig::new("file")).is_err());
    }
}
