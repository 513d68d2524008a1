//! `contextkeeper config` — Configuration management commands.

use super::{config_path, load_config};
use contextkeeper_config::ContextConfig;
use std::path::Path;

pub fn validate(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating {}...", config_path(path).display());

    match load_config(path) {
        Ok(config) => {
            println!("   ✅ Config is valid");
            println!();
            println!("   Default trigger:   {}", config.default_trigger);
            println!("   Provider timeout:  {}ms", config.provider_timeout_ms);
            println!("   Cache TTL:         {}ms", config.cache.ttl_ms);
            println!("   Cache ceiling:     {} MB", config.cache.max_size_mb);
            match config.cache.sweep_interval_ms {
                Some(ms) => println!("   Sweep interval:    {ms}ms"),
                None => println!("   Sweep interval:    off (expiry is lazy)"),
            }
            println!("   Weight overrides:  {}", config.provider_weights.len());
            Ok(())
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            Err(e.into())
        }
    }
}

pub fn show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn path(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_path(path).display());
    Ok(())
}

pub fn init(path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let target = config_path(path);
    if target.exists() && !force {
        return Err(format!(
            "{} already exists (pass --force to overwrite)",
            target.display()
        )
        .into());
    }
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&target, ContextConfig::default_toml())?;
    println!("Wrote default configuration to {}", target.display());
    Ok(())
}
