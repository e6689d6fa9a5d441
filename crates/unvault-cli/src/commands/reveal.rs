//! Reveal inputs to stdout

use super::{build_cache, load_config};
use crate::cli::{Cli, CliError, EXIT_FAILED, EXIT_OK, TokenDiagnostic, write_diagnostics};
use futures::future::{join_all, try_join_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use unvault::RevealService;

const STDIN_NAME: &str = "-";

/// Reveal every input concurrently through one shared cache.
///
/// Output keeps input order. Returns [`EXIT_FAILED`] when any token was not
/// revealed.
pub async fn execute(cli: &Cli) -> Result<i32, CliError> {
    let config = load_config(cli)?;
    let service = RevealService::new(build_cache(&config)).with_placeholder(&config.placeholder);

    let names = input_names(&cli.inputs)?;
    let texts = try_join_all(names.iter().map(|name| read_input(name))).await?;
    let outcomes = join_all(texts.iter().map(|text| service.reveal(text))).await;

    let mut diagnostics = Vec::new();
    let mut cache_reported = false;
    let mut stdout = io::stdout().lock();

    for (name, outcome) in names.iter().zip(&outcomes) {
        let name = name.display().to_string();
        stdout
            .write_all(outcome.text.as_bytes())
            .map_err(|e| CliError::config(format!("Failed to write output: {e}")))?;

        diagnostics.extend(
            outcome
                .failures
                .iter()
                .map(|failure| TokenDiagnostic::for_token(&name, failure)),
        );
        if let Some(err) = &outcome.cache_error
            && !cache_reported
        {
            diagnostics.push(TokenDiagnostic::for_cache(&name, err));
            cache_reported = true;
        }
    }
    stdout
        .flush()
        .map_err(|e| CliError::config(format!("Failed to write output: {e}")))?;
    drop(stdout);

    write_diagnostics(&diagnostics, cli.json)
        .map_err(|e| CliError::config(format!("Failed to write diagnostics: {e}")))?;

    tracing::debug!(
        inputs = names.len(),
        failures = diagnostics.len(),
        "Reveal finished"
    );

    if diagnostics.is_empty() {
        Ok(EXIT_OK)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Inputs to read, in order; stdin may be named at most once.
fn input_names(inputs: &[PathBuf]) -> Result<Vec<&Path>, CliError> {
    if inputs.is_empty() {
        return Ok(vec![Path::new(STDIN_NAME)]);
    }
    let stdin_count = inputs
        .iter()
        .filter(|p| p.as_path() == Path::new(STDIN_NAME))
        .count();
    if stdin_count > 1 {
        return Err(CliError::config_with_help(
            format!("stdin ('{STDIN_NAME}') was given {stdin_count} times"),
            "Name stdin at most once",
        ));
    }
    Ok(inputs.iter().map(PathBuf::as_path).collect())
}

async fn read_input(name: &Path) -> Result<String, CliError> {
    let bytes = if name == Path::new(STDIN_NAME) {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .map_err(|e| CliError::config(format!("Failed to read stdin: {e}")))?;
        buf
    } else {
        tokio::fs::read(name).await.map_err(|e| {
            CliError::config_with_help(
                format!("Failed to read input '{}': {e}", name.display()),
                "Check that the file exists and is readable",
            )
        })?
    };

    Ok(String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}
