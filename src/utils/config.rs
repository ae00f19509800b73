//! Configuration for the timeline player
//!
//! Player options can be loaded from TOML files and environment variables,
//! so a host application gets the same defaults, cache budgets and device
//! choice without wiring them up itself.

use crate::player::PlayerOptions;
use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Log levels accepted in configuration
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Library configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level the host should install (trace, debug, info, warn, error)
    pub log_level: String,

    pub player: PlayerOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            player: PlayerOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. System config file (/etc/timeline-player/config.toml on Linux)
    /// 3. User config file (~/.config/timeline-player/config.toml on Linux)
    /// 4. Environment variables (TLPLAYER_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        for path in [Self::system_config_path(), Self::user_config_path()].into_iter().flatten() {
            if path.exists() {
                log::debug!("Loading config: {}", path.display());
                config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a complete configuration from TOML; missing keys take defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).config_err("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Merge a TOML file over the current values
    ///
    /// Only the keys present in the file change.
    pub fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)?;
        self.merge_from_str(&contents)
    }

    fn merge_from_str(&mut self, text: &str) -> Result<()> {
        let overlay: toml::Table = toml::from_str(text).config_err("Failed to parse config file")?;
        let mut base = toml::Table::try_from(&*self).config_err("Failed to serialize config")?;
        merge_tables(&mut base, overlay);
        *self = base.try_into().config_err("Invalid config file")?;
        Ok(())
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache = &mut self.player.cache;
        if let Some(value) = parse_var(&lookup, "TLPLAYER_VIDEO_GB")? {
            cache.video_gb = value;
        }
        if let Some(value) = parse_var(&lookup, "TLPLAYER_AUDIO_GB")? {
            cache.audio_gb = value;
        }
        if let Some(value) = parse_var(&lookup, "TLPLAYER_READ_AHEAD")? {
            cache.read_ahead = value;
        }
        if let Some(value) = parse_var(&lookup, "TLPLAYER_READ_BEHIND")? {
            cache.read_behind = value;
        }
        if let Some(level) = lookup("TLPLAYER_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Validate configuration values
    ///
    /// Zero cache budgets are allowed; they keep the cache empty.
    pub fn validate(&self) -> Result<()> {
        let cache = &self.player.cache;
        for (name, value) in [
            ("video_gb", cache.video_gb),
            ("audio_gb", cache.audio_gb),
            ("read_ahead", cache.read_ahead),
            ("read_behind", cache.read_behind),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlayerError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.player.video_request_count == 0 || self.player.audio_request_count == 0 {
            return Err(PlayerError::Config("Request counts must be non-zero".to_string()));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(PlayerError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.log_level, LOG_LEVELS
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/timeline-player/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA")
            .ok()
            .map(|p| PathBuf::from(p).join("TimelinePlayer").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/TimelinePlayer/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("timeline-player").join("config.toml"))
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| PlayerError::Config(format!("Invalid {}: {}", name, value)))
        })
        .transpose()
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base)), toml::Value::Table(overlay)) => merge_tables(base, overlay),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioDeviceId;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.player.cache.video_gb, 4.0);
        assert_eq!(config.player.cache.audio_gb, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.player.cache.video_gb = 0.0;
        assert!(config.validate().is_ok());

        config.player.cache.read_ahead = -1.0;
        assert!(config.validate().is_err());

        config.player.cache.read_ahead = f64::INFINITY;
        assert!(config.validate().is_err());

        config.player.cache.read_ahead = 1.0;
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.log_level = "warn".to_string();
        config.player.video_request_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_str() {
        let config = Config::from_toml_str(
            r#"
            log_level = "debug"

            [player]
            audio_device = "Disabled"
            sleep_timeout = 10

            [player.cache]
            audio_gb = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.player.audio_device, AudioDeviceId::Disabled);
        assert_eq!(config.player.sleep_timeout, Duration::from_millis(10));
        assert_eq!(config.player.cache.audio_gb, 0.25);
        assert_eq!(config.player.cache.video_gb, 4.0);

        assert!(Config::from_toml_str("log_level = 3").is_err());
    }

    #[test]
    fn test_merge_keeps_unset_values() {
        let mut config = Config::default();
        config.player.cache.read_ahead = 8.0;
        config.merge_from_str("[player.cache]\nread_behind = 1.5\n").unwrap();
        assert_eq!(config.player.cache.read_ahead, 8.0);
        assert_eq!(config.player.cache.read_behind, 1.5);
    }

    #[test]
    fn test_merge_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"trace\"\n[player]\nvideo_request_count = 2\n").unwrap();

        let mut config = Config::default();
        config.merge_from_file(&path).unwrap();
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.player.video_request_count, 2);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(config.merge_from_file(&missing), Err(PlayerError::FileIO(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TLPLAYER_VIDEO_GB", "1.5"),
            ("TLPLAYER_READ_BEHIND", " 0.25 "),
            ("TLPLAYER_LOG_LEVEL", "warn"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_env_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.player.cache.video_gb, 1.5);
        assert_eq!(config.player.cache.read_behind, 0.25);
        assert_eq!(config.player.cache.audio_gb, 0.5);
        assert_eq!(config.log_level, "warn");

        let result = config.apply_env_overrides(|name| {
            (name == "TLPLAYER_AUDIO_GB").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(PlayerError::Config(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(config, back);
    }
}
