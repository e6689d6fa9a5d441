//! Command execution secret provider

use super::{SecretProvider, identity_from_material, identity_id};
use crate::error::ProviderError;
use crate::identity::SecretIdentity;
use crate::ProviderConfig;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Loads one identity from the standard output of an external command.
///
/// The command is executed directly, never through a shell, and only when
/// explicitly configured. With `pass_vault_id` set, `--vault-id <id>` is
/// appended to the arguments, matching the vault client script convention.
#[derive(Debug, Clone)]
pub struct ExecProvider {
    command: String,
    args: Vec<String>,
    id: String,
    pass_vault_id: bool,
}

impl ExecProvider {
    /// Create a provider running `command` with `args` for identity `id`
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>, id: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args,
            id: id.into(),
            pass_vault_id: false,
        }
    }

    /// Append `--vault-id <id>` when invoking the command
    #[must_use]
    pub const fn with_vault_id_arg(mut self, pass_vault_id: bool) -> Self {
        self.pass_vault_id = pass_vault_id;
        self
    }

    /// Build from a configuration entry
    ///
    /// Parameters: `command` (required), `args` (whitespace-separated),
    /// `id`, `pass_vault_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] when `command` is missing,
    /// `id` is not a valid identity id or `pass_vault_id` is not a boolean.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let args = config
            .param("args")
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(
            Self::new(config.require("command")?, args, identity_id(config)?)
                .with_vault_id_arg(config.flag("pass_vault_id")?),
        )
    }

    fn command_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if self.pass_vault_id {
            args.push("--vault-id".to_string());
            args.push(self.id.clone());
        }
        args
    }
}

#[async_trait]
impl SecretProvider for ExecProvider {
    fn provider_name(&self) -> &'static str {
        "exec"
    }

    async fn load_identities(&self) -> Result<Vec<SecretIdentity>, ProviderError> {
        tracing::debug!(command = %self.command, id = %self.id, "Running vault password command");

        let output = Command::new(&self.command)
            .args(self.command_args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ProviderError::io(
                    self.provider_name(),
                    format!("failed to execute command '{}': {e}", self.command),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::io(
                self.provider_name(),
                format!(
                    "command '{}' failed ({}): {}",
                    self.command,
                    output.status,
                    stderr.trim()
                ),
            ));
        }

        Ok(vec![identity_from_material(
            self.provider_name(),
            &self.id,
            trim_line_endings(&output.stdout).to_vec(),
        )?])
    }
}

fn trim_line_endings(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !matches!(b, b'\r' | b'\n'))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b'\n'))
        .map_or(start, |pos| pos + 1);
    &bytes[start..end]
}
