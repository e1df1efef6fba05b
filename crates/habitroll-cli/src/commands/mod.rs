pub mod completion;
pub mod config;
pub mod habit;
pub mod reward;
pub mod user;

use habitroll_core::{CompletionOrchestrator, Config, Database};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the configured database with the engine settings from config.toml.
pub fn open_engine() -> Result<CompletionOrchestrator, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open_at(config.database_path()?)?;
    Ok(CompletionOrchestrator::new(db, config.engine_settings()?))
}

pub fn open_database() -> Result<Database, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    Ok(Database::open_at(config.database_path()?)?)
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
