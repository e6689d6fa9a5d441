//! `unvault`: reveal inline vault tokens
//!
//! ```text
//! unvault -c vault.yml inventory.yml > revealed.yml
//! printf 's3cret' | unvault -c vault.yml encrypt --id prod
//! ```

mod cli;
mod commands;
mod tracing;

use cli::{Cli, Commands, exit_code_for, render_error};

fn main() {
    // tracing may not be initialized yet when a panic happens
    #[allow(clippy::print_stderr)]
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();
    let exit_code = run_with_tokio(cli);
    std::process::exit(exit_code);
}

/// Create tokio runtime and run the selected command
fn run_with_tokio(cli: Cli) -> i32 {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            }
            return cli::EXIT_FAILED;
        }
    };

    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> i32 {
    let tracing_config = tracing::TracingConfig {
        format: cli.effective_log_format(),
        level: cli.level.into(),
        ..Default::default()
    };
    if let Err(err) = tracing::init_tracing(tracing_config) {
        render_error(&cli::CliError::config(err.to_string()), cli.json);
        return cli::EXIT_CLI;
    }

    let result = match &cli.command {
        Some(Commands::Encrypt { id, raw }) => {
            commands::encrypt::execute(&cli, id.as_deref(), *raw).await
        }
        None => commands::reveal::execute(&cli).await,
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            render_error(&err, cli.json);
            exit_code_for(&err)
        }
    }
}
