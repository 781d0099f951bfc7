//! Generation entry points that hide the request wiring.

use std::path::Path;

use genstar_config::{ConfigError, GenerationConfig};
use genstar_core::GenstarError;
use genstar_generator::{GenerationOutcome, PopulationGenerator, RequestAssembler};
use thiserror::Error;
use tracing::debug;

/// Failure of a file driven generation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generation(#[from] GenstarError),
}

/// Loads the configuration at `path` and generates `size` entities.
///
/// Relative input paths resolve against the configuration's `base_dir`, or
/// against the directory holding the file when none is set.
pub fn generate_from_file(path: impl AsRef<Path>, size: i64) -> Result<GenerationOutcome, Error> {
    let path = path.as_ref();
    let mut config = GenerationConfig::load(path)?;
    if config.base_dir.is_none() {
        config.base_dir = path.parent().map(Path::to_path_buf);
    }
    debug!(event = "config_loaded", path = %path.display());
    generate_from_config(&config, size)
}

/// Generates `size` entities from an already parsed configuration.
///
/// A non positive size is resolved from the inputs.
pub fn generate_from_config(config: &GenerationConfig, size: i64) -> Result<GenerationOutcome, Error> {
    #[cfg(feature = "console")]
    crate::console::init();

    let request = RequestAssembler::from_config(config)
        .and_then(|builder| builder.build())
        .map_err(GenstarError::from)?;
    Ok(PopulationGenerator::new().generate_request(&request, size)?)
}
