use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for MzaniGo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub storage: StorageConfig,
    pub booking: BookingConfig,
    pub rate_limiter: RateLimiterConfig,
    pub locale: LocaleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub default_user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model used for structured route generation
    pub route_model: String,
    /// Model used for freeform rank advice
    pub advice_model: String,
    pub timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub route_search: bool,
    #[serde(default = "default_true")]
    pub route_maps: bool,
    #[serde(default = "default_true")]
    pub advice_search: bool,
    #[serde(default = "default_advice_fallback")]
    pub advice_fallback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// How long the simulated payment authorisation takes
    pub payment_delay_ms: u64,
    pub qr_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    pub max_requests: u32,
    pub window_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    pub country: String,
    /// Offset of local wall-clock time from UTC, in minutes (SAST = +120)
    pub utc_offset_minutes: i32,
}

fn default_true() -> bool {
    true
}

fn default_advice_fallback() -> String {
    crate::advice::ADVICE_FALLBACK.to_string()
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
            }
        }

        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("MZANIGO_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_file(&config_path);

        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Read a YAML config file, falling back to defaults when missing or invalid
    pub fn from_file(config_path: &str) -> Self {
        if !Path::new(config_path).exists() {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            return Self::default();
        }

        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path);
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    config_path,
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(user_id) = lookup("MZANIGO_USER_ID") {
            self.server.default_user_id = user_id;
        }

        // Gemini overrides; API_KEY wins over GEMINI_API_KEY
        if let Some(api_key) = lookup("API_KEY").or_else(|| lookup("GEMINI_API_KEY")) {
            self.gemini.api_key = api_key;
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            self.gemini.base_url = base_url;
        }
        if let Some(model) = lookup("GEMINI_ROUTE_MODEL") {
            self.gemini.route_model = model;
        }
        if let Some(model) = lookup("GEMINI_ADVICE_MODEL") {
            self.gemini.advice_model = model;
        }
        if let Some(timeout) = lookup("GEMINI_TIMEOUT_SECONDS") {
            if let Ok(secs) = timeout.parse() {
                self.gemini.timeout_seconds = secs;
            }
        }

        // Storage overrides
        if let Some(dir) = lookup("MZANIGO_DATA_DIR") {
            self.storage.data_dir = dir;
        }

        // Booking overrides
        if let Some(delay) = lookup("MZANIGO_PAYMENT_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                self.booking.payment_delay_ms = ms;
            }
        }

        // Rate limiter overrides
        if let Some(max_requests) = lookup("MZANIGO_RATE_LIMIT_MAX_REQUESTS") {
            if let Ok(max) = max_requests.parse() {
                self.rate_limiter.max_requests = max;
            }
        }
        if let Some(window) = lookup("MZANIGO_RATE_LIMIT_WINDOW_SECONDS") {
            if let Ok(window_secs) = window.parse() {
                self.rate_limiter.window_seconds = window_secs;
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.gemini.api_key.is_empty() {
            return Err("API_KEY or GEMINI_API_KEY environment variable must be set".into());
        }
        if self.gemini.route_model.is_empty() || self.gemini.advice_model.is_empty() {
            return Err("Gemini model identifiers cannot be empty".into());
        }
        if self.gemini.timeout_seconds == 0 {
            return Err("Gemini timeout_seconds cannot be 0".into());
        }

        if self.rate_limiter.max_requests == 0 {
            return Err("Rate limiter max_requests cannot be 0".into());
        }
        if self.rate_limiter.window_seconds == 0 {
            return Err("Rate limiter window_seconds cannot be 0".into());
        }

        // UTC-14..UTC+14
        if self.locale.utc_offset_minutes.abs() > 14 * 60 {
            return Err("locale.utc_offset_minutes must be within +/- 840".into());
        }

        Ok(())
    }

    pub fn gemini_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.timeout_seconds)
    }

    pub fn payment_delay(&self) -> Duration {
        Duration::from_millis(self.booking.payment_delay_ms)
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "mzanigo".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                default_user_id: "local".to_string(),
            },
            gemini: GeminiConfig {
                api_key: String::new(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                route_model: "gemini-2.5-flash".to_string(),
                advice_model: "gemini-3-flash-preview".to_string(),
                timeout_seconds: 60,
                route_search: true,
                route_maps: true,
                advice_search: true,
                advice_fallback: default_advice_fallback(),
            },
            storage: StorageConfig {
                data_dir: ".mzanigo".to_string(),
            },
            booking: BookingConfig {
                payment_delay_ms: 2000,
                qr_prefix: "MZ-".to_string(),
            },
            rate_limiter: RateLimiterConfig {
                max_requests: 30,
                window_seconds: 60,
            },
            locale: LocaleConfig {
                country: "South Africa".to_string(),
                utc_offset_minutes: 120,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_gemini_call_families() {
        let cfg = Config::default();
        assert_eq!(cfg.gemini.route_model, "gemini-2.5-flash");
        assert_eq!(cfg.gemini.advice_model, "gemini-3-flash-preview");
        assert_eq!(cfg.gemini.advice_fallback, "Scanning for local ranks...");
        assert_eq!(cfg.locale.utc_offset_minutes, 120);
        assert_eq!(cfg.payment_delay(), Duration::from_millis(2000));
    }

    #[test]
    fn test_api_key_precedence() {
        let mut cfg = Config::default();
        cfg.apply_overrides(lookup_from(&[
            ("GEMINI_API_KEY", "gemini-key"),
            ("API_KEY", "primary-key"),
        ]));
        assert_eq!(cfg.gemini.api_key, "primary-key");

        let mut cfg = Config::default();
        cfg.apply_overrides(lookup_from(&[("GEMINI_API_KEY", "gemini-key")]));
        assert_eq!(cfg.gemini.api_key, "gemini-key");
    }

    #[test]
    fn test_numeric_overrides_ignore_garbage() {
        let mut cfg = Config::default();
        cfg.apply_overrides(lookup_from(&[
            ("MZANIGO_PAYMENT_DELAY_MS", "10"),
            ("MZANIGO_RATE_LIMIT_MAX_REQUESTS", "lots"),
            ("GEMINI_ROUTE_MODEL", "gemini-test"),
        ]));
        assert_eq!(cfg.booking.payment_delay_ms, 10);
        assert_eq!(cfg.rate_limiter.max_requests, 30);
        assert_eq!(cfg.gemini.route_model, "gemini-test");
    }

    #[test]
    fn test_validate_requires_api_key() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_err());
        cfg.gemini.api_key = "k".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = Config::from_file("/definitely/not/here/config.yaml");
        assert_eq!(cfg.server.name, "mzanigo");
    }

    #[test]
    fn test_yaml_toggles_default_on() {
        let yaml = r#"
server:
  name: mzanigo
  version: "2.5.0"
  default_user_id: thabo
gemini:
  api_key: ""
  base_url: "http://localhost:9999"
  route_model: m1
  advice_model: m2
  timeout_seconds: 5
storage:
  data_dir: /tmp/mz
booking:
  payment_delay_ms: 0
  qr_prefix: "MZ-"
rate_limiter:
  max_requests: 5
  window_seconds: 10
locale:
  country: South Africa
  utc_offset_minutes: 120
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.gemini.route_search);
        assert!(cfg.gemini.route_maps);
        assert!(cfg.gemini.advice_search);
        assert_eq!(cfg.server.default_user_id, "thabo");
        assert_eq!(cfg.gemini.advice_fallback, "Scanning for local ranks...");
    }
}
