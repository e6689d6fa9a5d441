use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use miette::{Diagnostic, Report};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use unvault::{CacheError, ConfigError, TokenFailure};

/// Every token was revealed
pub const EXIT_OK: i32 = 0;
/// At least one token failed, or decryption was unavailable
pub const EXIT_FAILED: i32 = 1;
/// CLI, configuration or input error
pub const EXIT_CLI: i32 = 2;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Bad arguments, configuration or unreadable input (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(unvault::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Decryption could not be performed (exit code 1)
    #[error("Decryption error: {message}")]
    #[diagnostic(code(unvault::cli::decrypt))]
    Decrypt {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new decryption error
    #[must_use]
    #[allow(dead_code)]
    pub fn decrypt(message: impl Into<String>) -> Self {
        Self::Decrypt {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new decryption error with help text
    #[must_use]
    pub fn decrypt_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Decrypt {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::config_with_help(
            err.to_string(),
            "Check the file passed with --config or UNVAULT_CONFIG",
        )
    }
}

impl From<CacheError> for CliError {
    fn from(err: CacheError) -> Self {
        Self::decrypt_with_help(
            err.to_string(),
            "Check that the configured vault password providers are reachable",
        )
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Decrypt { .. } => EXIT_FAILED,
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let record = serde_json::json!({
            "status": "error",
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Decrypt { .. } => "decrypt",
            },
            "message": err.to_string(),
        });
        eprintln!("{record}");
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// One reveal problem, reported on stderr.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenDiagnostic {
    /// Input name (`-` for stdin)
    pub input: String,
    /// Byte offset where the token starts, absent for context failures
    pub span_start: Option<usize>,
    /// Byte offset just past the token
    pub span_end: Option<usize>,
    /// Machine-readable error kind
    pub error_kind: &'static str,
    /// Human-readable message
    pub message: String,
}

impl TokenDiagnostic {
    /// Diagnostic for a single token
    #[must_use]
    pub fn for_token(input: &str, failure: &TokenFailure) -> Self {
        Self {
            input: input.to_string(),
            span_start: Some(failure.span.start),
            span_end: Some(failure.span.end),
            error_kind: failure.kind(),
            message: failure.message(),
        }
    }

    /// Diagnostic for an unavailable decryption context
    #[must_use]
    pub fn for_cache(input: &str, err: &CacheError) -> Self {
        Self {
            input: input.to_string(),
            span_start: None,
            span_end: None,
            error_kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Render as one line of text or JSON
    #[must_use]
    pub fn render(&self, json_mode: bool) -> String {
        if json_mode {
            return serde_json::to_string(self).unwrap_or_else(|_| self.render(false));
        }
        match (self.span_start, self.span_end) {
            (Some(start), Some(end)) => format!(
                "{}:{start}..{end}: {}: {}",
                self.input, self.error_kind, self.message
            ),
            _ => format!("{}: {}: {}", self.input, self.error_kind, self.message),
        }
    }
}

/// Write diagnostics to stderr, one per line
pub fn write_diagnostics(diagnostics: &[TokenDiagnostic], json_mode: bool) -> io::Result<()> {
    let mut stderr = io::stderr().lock();
    for diagnostic in diagnostics {
        writeln!(stderr, "{}", diagnostic.render(json_mode))?;
    }
    stderr.flush()
}

/// Reveal inline vault tokens.
///
/// Reads each INPUT (or stdin), replaces every vault token with its
/// plaintext and writes the result to stdout. Tokens that cannot be
/// decrypted are replaced by a placeholder and reported on stderr.
#[derive(Parser, Debug)]
#[command(name = "unvault")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Files to reveal; `-` or no files reads stdin.
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Provider configuration file (YAML).
    #[arg(short = 'c', long, global = true, env = "UNVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Text substituted for tokens that cannot be decrypted.
    #[arg(long, global = true)]
    pub placeholder: Option<String>,

    /// Seconds allowed for loading vault identities.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<TracingFormat>,

    /// Emit diagnostics and errors as JSON lines.
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encrypt stdin into vault text.
    Encrypt {
        /// Identity to encrypt with; defaults to the first configured identity.
        #[arg(long)]
        id: Option<String>,

        /// Keep a trailing newline in the plaintext.
        #[arg(long)]
        raw: bool,
    },
}

impl Cli {
    /// Log format to use when none was given explicitly
    #[must_use]
    pub fn effective_log_format(&self) -> TracingFormat {
        self.log_format.unwrap_or(if self.json {
            TracingFormat::Json
        } else {
            TracingFormat::Compact
        })
    }
}

/// Parse command-line arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
