//! rtcache CLI commands.

use std::path::{Path, PathBuf};

use crate::cache::KeyEncoding;
use crate::types::config::{Config, CONFIG_FILE};
use crate::RuntimeCacheResult;

/// Writes a default configuration into the specified directory.
pub fn init(path: Option<PathBuf>) -> RuntimeCacheResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join(CONFIG_FILE);

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        return Ok(());
    }

    Config::default().save(&config_path)?;

    println!("Configuration created at: {}", config_path.display());
    Ok(())
}

/// Prints the normalized key for `segments`.
pub fn key(
    segments: &[String],
    encoding: Option<KeyEncoding>,
    all: bool,
    config: &Config,
) -> RuntimeCacheResult<()> {
    let key: &[String] = segments;

    if all {
        for encoding in KeyEncoding::ALL {
            println!("{:<16} {}", encoding, encoding.normalize(key));
        }
        return Ok(());
    }

    let encoding = encoding.unwrap_or(config.cache.key_encoding);
    tracing::debug!(%encoding, segments = segments.len(), "normalizing key");
    println!("{}", encoding.normalize(key));
    Ok(())
}

/// Prints the effective configuration.
pub fn config_cmd(config_path: &Path, config: &Config, json: bool) -> RuntimeCacheResult<()> {
    if config_path.exists() {
        tracing::debug!("Configuration loaded from: {}", config_path.display());
    } else {
        tracing::debug!("{} not found, showing defaults", config_path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

/// Shows version.
pub fn version() {
    println!("rtcache {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Runtime memoization cache");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_default_config() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested");

        init(Some(target.clone())).unwrap();

        let loaded = Config::load(target.join(CONFIG_FILE)).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut custom = Config::default();
        custom.cache.key_encoding = KeyEncoding::Hashed;
        custom.save(&path).unwrap();

        init(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(Config::load(&path).unwrap(), custom);
    }

    #[test]
    fn test_key_and_config_commands_succeed() {
        let config = Config::default();
        let segments = vec!["user".to_string(), "42".to_string()];

        assert!(key(&segments, None, false, &config).is_ok());
        assert!(key(&segments, Some(KeyEncoding::Joined), false, &config).is_ok());
        assert!(key(&segments, None, true, &config).is_ok());
        assert!(config_cmd(Path::new("missing.toml"), &config, true).is_ok());
    }
}
