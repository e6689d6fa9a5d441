//! Encrypt stdin into vault text

use super::{build_cache, load_config};
use crate::cli::{Cli, CliError, EXIT_OK};
use std::io::{self, Write};
use tokio::io::AsyncReadExt;

/// Encrypt stdin with the identity `id` (or the first identity) and write
/// the vault text to stdout.
///
/// One trailing line break is dropped from the plaintext unless `raw` is set.
pub async fn execute(cli: &Cli, id: Option<&str>, raw: bool) -> Result<i32, CliError> {
    let config = load_config(cli)?;
    let cache = build_cache(&config);

    let mut plaintext = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut plaintext)
        .await
        .map_err(|e| CliError::config(format!("Failed to read stdin: {e}")))?;
    if !raw {
        strip_line_break(&mut plaintext);
    }

    let context = cache.get_context().await?;
    let vault_text = context.encrypt(&plaintext, id).map_err(|e| {
        CliError::decrypt_with_help(
            e.to_string(),
            format!("Configured identities: {}", context.identity_ids().join(", ")),
        )
    })?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(vault_text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|e| CliError::config(format!("Failed to write output: {e}")))?;

    tracing::debug!(bytes = plaintext.len(), "Encrypted stdin");
    Ok(EXIT_OK)
}

fn strip_line_break(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}
