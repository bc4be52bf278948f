//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `entity_repo_core` linkage and the env-driven configuration path.
//! - Open one session against the configured database and report the result.

use entity_repo_core::{init_logging, RepositoryConfig, SessionManager, SessionProvider};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("entity_repo_core ping={}", entity_repo_core::ping());
    println!("entity_repo_core version={}", entity_repo_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("entity_repo_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = RepositoryConfig::from_env().map_err(|err| err.to_string())?;
    init_logging(&config.logging())?;

    let manager = SessionManager::from_config(&config).map_err(|err| err.to_string())?;
    let probe: i64 = manager
        .with_session(|conn| Ok(conn.query_row("SELECT 1;", [], |row| row.get(0))?))
        .map_err(|err| err.to_string())?;

    log::info!(
        "event=cli_probe module=cli status=ok target={} probe={probe}",
        manager.target()
    );
    println!("database target={} probe={probe}", manager.target());
    Ok(())
}
