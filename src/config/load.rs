use crate::config::{validate_engine_config, ConfigError, EngineConfig};
use std::fs;
use std::path::Path;

pub fn load_engine_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: EngineConfig =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    validate_engine_config(&config)?;
    Ok(config)
}
