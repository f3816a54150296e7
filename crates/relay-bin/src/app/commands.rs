//! CLI commands.

use crate::app::RelayRuntime;
use relay_config_and_utils::{Config, Paths};
use relay_storage::{FileStorage, SessionStore};
use std::path::PathBuf;
use tracing::info;

fn open_session(paths: &Paths) -> Result<SessionStore, Box<dyn std::error::Error>> {
    let storage = FileStorage::open(paths.storage_file())?;
    Ok(SessionStore::new(Box::new(storage)))
}

/// Sign in through the popup, as a user clicking "Sign in" would.
pub async fn sign_in(
    config: &Config,
    paths: &Paths,
    identity_file: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = RelayRuntime::start(config, open_session(paths)?, identity_file)?;
    let (_popup, mut view) = runtime.open_popup();

    let outcome = view.sign_in().await.map(|model| model.status_text.clone());
    runtime.shutdown().await;

    match outcome {
        Ok(status) => {
            info!("Sign-in completed");
            println!("{}", status);
            Ok(())
        }
        Err(e) => {
            println!("Sign-in failed: {}", e.reason());
            Err(e.into())
        }
    }
}

/// Forget the signed-in identity.
pub async fn sign_out(config: &Config, paths: &Paths) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = RelayRuntime::start(config, open_session(paths)?, None)?;
    let (_popup, mut view) = runtime.open_popup();

    let status = view.sign_out().await.status_text.clone();
    runtime.shutdown().await;
    println!("{}", status);
    Ok(())
}

/// Show the persisted identity.
pub async fn check_status(
    config: &Config,
    paths: &Paths,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = RelayRuntime::start(config, open_session(paths)?, None)?;
    let (_popup, mut view) = runtime.open_popup();

    println!("{}", view.load().status_text);
    println!("Storage: {}", paths.storage_file().display());
    runtime.shutdown().await;
    Ok(())
}
