//! CLI smoke entry point.
//!
//! # Responsibility
//! - Resolve configuration from the environment and bring up logging.
//! - Open (and migrate) the configured database and report its state.

use groupcal_core::db::migrations::{current_version, latest_version};
use groupcal_core::{init_logging_from_config, open_db_with_options, GroupcalConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("groupcal_core ping={}", groupcal_core::ping());
    println!("groupcal_core version={}", groupcal_core::core_version());

    let config = match GroupcalConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match init_logging_from_config(&config) {
        Ok(true) => println!("logging level={} dir={:?}", config.log_level, config.log_dir),
        Ok(false) => println!("logging disabled"),
        Err(err) => {
            eprintln!("logging error: {err}");
            return ExitCode::FAILURE;
        }
    }

    let conn = match open_db_with_options(&config.db_path, &config.db_options()) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("database error at {}: {err}", config.db_path.display());
            return ExitCode::FAILURE;
        }
    };
    match current_version(&conn) {
        Ok(version) => {
            println!(
                "db path={} schema_version={version}/{}",
                config.db_path.display(),
                latest_version()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("database error: {err}");
            ExitCode::FAILURE
        }
    }
}
