use std::path::PathBuf;
use std::time::Duration;

use crate::world::player::PlayerId;

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct Settings {
    /// Steam Web API key; enrichment fetches are skipped when absent
    pub steam_api_key: Option<String>,
    /// SteamID64 of the account running the monitored game client
    pub local_player: Option<PlayerId>,
    /// When false, player records queue all enrichment kinds on creation
    /// instead of waiting for the first read of each slot
    pub lazy_load_api_data: bool,
    /// Path to the game client's console log file
    pub console_log_path: Option<PathBuf>,
    /// How often the monitor binary polls the log and ticks the world
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            steam_api_key: None,
            local_player: None,
            lazy_load_api_data: true,
            console_log_path: None,
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl Settings {
    /// Load settings from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut settings = Self::default();

        if let Ok(key) = std::env::var("STEAM_API_KEY") {
            if key.trim().is_empty() {
                tracing::warn!("STEAM_API_KEY is empty, enrichment disabled");
            } else {
                settings.steam_api_key = Some(key);
            }
        }

        if let Ok(id) = std::env::var("LOCAL_PLAYER_ID") {
            if let Ok(parsed) = id.parse::<u64>() {
                settings.local_player = Some(PlayerId(parsed));
            } else {
                tracing::warn!("Invalid LOCAL_PLAYER_ID '{}', ignoring", id);
            }
        }

        if let Ok(lazy) = std::env::var("LAZY_LOAD_API_DATA") {
            match lazy.as_str() {
                "1" | "true" => settings.lazy_load_api_data = true,
                "0" | "false" => settings.lazy_load_api_data = false,
                _ => tracing::warn!("Invalid LAZY_LOAD_API_DATA '{}', using default", lazy),
            }
        }

        if let Ok(path) = std::env::var("CONSOLE_LOG_PATH") {
            settings.console_log_path = Some(PathBuf::from(path));
        }

        if let Ok(interval) = std::env::var("POLL_INTERVAL_MS") {
            if let Ok(parsed) = interval.parse::<u64>() {
                if parsed > 0 {
                    settings.poll_interval = Duration::from_millis(parsed);
                } else {
                    tracing::warn!("POLL_INTERVAL_MS must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid POLL_INTERVAL_MS '{}', using default", interval);
            }
        }

        settings
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval.is_zero() {
            return Err("poll_interval cannot be zero".to_string());
        }
        if self.steam_api_key.is_some() && self.local_player.is_none() {
            return Err(
                "LOCAL_PLAYER_ID is required when STEAM_API_KEY is set (friends lookups)"
                    .to_string(),
            );
        }
        Ok(())
    }

    /// True when both a credential and a local account id are configured
    pub fn api_configured(&self) -> bool {
        self.steam_api_key.is_some() && self.local_player.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.steam_api_key.is_none());
        assert!(settings.lazy_load_api_data);
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_key_without_local_player_fails_validation() {
        let settings = Settings {
            steam_api_key: Some("abc".to_string()),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_api_configured() {
        let mut settings = Settings::default();
        assert!(!settings.api_configured());

        settings.steam_api_key = Some("abc".to_string());
        assert!(!settings.api_configured());

        settings.local_player = Some(PlayerId(76561198000000001));
        assert!(settings.api_configured());
    }
}
