use std::process::ExitCode;

use legacy_migrations::{Database, Error, SystemClock};
use tracing::{error, info};

use crate::config::Config;

mod config;
mod logging;

fn run() -> Result<(), Error> {
    let config = Config::from_env()?;
    let mut db = Database::open(&config.database_path)?;

    let report = db.upgrade_to(config.target_version, &SystemClock)?;
    if report.is_empty() {
        info!("schema already at version {}", db.schema_version()?);
    } else {
        info!(
            "applied {} migrations, schema now at version {}",
            report.applied().len(),
            db.schema_version()?
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
