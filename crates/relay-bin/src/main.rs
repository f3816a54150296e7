//! Auth Relay - signs a user in through an ephemeral offscreen host.

mod app;
mod provider;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use relay_config_and_utils::{init_logging, Config, Paths};

/// Auth relay command-line interface.
#[derive(Parser)]
#[command(name = "auth-relay")]
#[command(about = "Relay sign-in between popup, background and an offscreen provider host")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (storage, logs, config). Defaults to ~/.auth-relay
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// JSON identity the scripted provider page answers with
    #[arg(long, global = true)]
    identity_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in through the provider page
    SignIn,
    /// Forget the signed-in identity
    SignOut,
    /// Show the signed-in identity
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(&paths, &level, false)?;

    match cli.command {
        Commands::SignIn => app::sign_in(&config, &paths, cli.identity_file).await?,
        Commands::SignOut => app::sign_out(&config, &paths).await?,
        Commands::Status => app::check_status(&config, &paths).await?,
    }

    Ok(())
}
