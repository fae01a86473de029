pub mod settings;

pub use settings::{Config, VenueConfig};

use crate::error::ArbError;
use std::sync::Arc;

/// Loads `.env` (if present), reads the environment and validates the result.
/// The returned snapshot is shared read-only for the process lifetime.
pub fn load_config() -> Result<Arc<Config>, ArbError> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    config.validate()?;
    Ok(Arc::new(config))
}
