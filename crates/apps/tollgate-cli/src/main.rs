//! Tollgate CLI binary entry point.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tollgate_cli::{
    cli::{Cli, Commands},
    commands,
    config::{default_config_path, CliConfig},
    error::{CliError, CliResult},
    output::OutputFormat,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on --verbose flag or RUST_LOG env var
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if cli.verbose || has_rust_log {
        let mut filter = EnvFilter::from_default_env();
        if cli.verbose {
            if let Ok(directive) = "tollgate=debug".parse() {
                filter = filter.add_directive(directive);
            }
        }
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    if let Err(e) = run(cli).await {
        print_error(&e);
        std::process::exit(e.exit_code());
    }
}

/// Print a user-friendly error message with category and recovery hint.
fn print_error(e: &CliError) {
    match e.category() {
        Some(category) => eprintln!(
            "{} [{}]: {}",
            "Error".red().bold(),
            category.to_string().yellow(),
            e
        ),
        None => eprintln!("{}: {}", "Error".red().bold(), e),
    }

    if let Some(suggestion) = e.suggestion() {
        eprintln!("{}: {}", "Hint".cyan(), suggestion);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    // Load configuration
    let overrides = cli.overrides();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = CliConfig::load_with(&config_path, &overrides)?;

    // Get output format
    let format: OutputFormat = cli.format.into();

    // Dispatch command
    let output = match cli.command {
        Commands::Serve { listen, path, file } => {
            commands::serve(config, format, listen, path, file).await?
        }

        Commands::Challenge { url } => commands::challenge(&config, format, &url).await?,

        Commands::Fetch {
            url,
            proof,
            proof_network,
            output,
        } => commands::fetch(&config, format, &url, &proof, proof_network, output).await?,

        Commands::Config => commands::show_config(&config, &config_path, format)?,
    };

    // Print output
    println!("{}", output);

    Ok(())
}
