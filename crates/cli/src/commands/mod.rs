pub mod config_cmd;
pub mod gather;
pub mod providers;

use contextkeeper_config::{ConfigError, ContextConfig};
use std::path::Path;

/// Load config from `path` when given, else from the default location.
/// Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<ContextConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = ContextConfig::load_from(path)?;
            config.apply_env_overrides(|var| std::env::var(var).ok())?;
            config.validate()?;
            Ok(config)
        }
        None => ContextConfig::load(),
    }
}

pub fn config_path(path: Option<&Path>) -> std::path::PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| ContextConfig::config_dir().join("config.toml"))
}
