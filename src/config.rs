//! Configuration for the Lark Open Platform app
//!
//! Loads configuration from config.yml file, `.env` and the environment

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn";
pub const CHAT_PAGE_SIZE: u32 = 20;
pub const MESSAGE_PAGE_SIZE: u32 = 50;

pub const ENV_APP_ID: &str = "LARK_APP_ID";
pub const ENV_APP_SECRET: &str = "LARK_APP_SECRET";
pub const ENV_BASE_URL: &str = "LARK_BASE_URL";

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    lark: Option<LarkConfig>,
    limits: Option<LimitsConfig>,
}

#[derive(Debug, Deserialize)]
struct LarkConfig {
    app_id: Option<String>,
    app_secret: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LimitsConfig {
    chat_page_size: Option<u32>,
    message_page_size: Option<u32>,
}

/// App credentials used to obtain a tenant access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub app_id: String,
    pub app_secret: String,
    pub base_url: String,
    pub chat_page_size: u32,
    pub message_page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
                return String::new();
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            return env_val;
        }
        value.unwrap_or_default()
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, String> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        let lark = yaml.lark.unwrap_or(LarkConfig {
            app_id: None,
            app_secret: None,
            base_url: None,
        });

        let limits = yaml.limits.unwrap_or(LimitsConfig {
            chat_page_size: None,
            message_page_size: None,
        });

        let base_url = Self::resolve_env_string(lark.base_url, ENV_BASE_URL);

        Ok(Self {
            app_id: Self::resolve_env_string(lark.app_id, ENV_APP_ID),
            app_secret: Self::resolve_env_string(lark.app_secret, ENV_APP_SECRET),
            base_url: if base_url.trim().is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                base_url
            },
            chat_page_size: limits.chat_page_size.unwrap_or(CHAT_PAGE_SIZE),
            message_page_size: limits.message_page_size.unwrap_or(MESSAGE_PAGE_SIZE),
        })
    }

    /// Environment-only configuration, used when no config.yml exists.
    fn defaults() -> Self {
        Self::load_dotenv();

        let base_url = Self::resolve_env_string(None, ENV_BASE_URL);
        Self {
            app_id: Self::resolve_env_string(None, ENV_APP_ID),
            app_secret: Self::resolve_env_string(None, ENV_APP_SECRET),
            base_url: if base_url.trim().is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                base_url
            },
            chat_page_size: CHAT_PAGE_SIZE,
            message_page_size: MESSAGE_PAGE_SIZE,
        }
    }

    /// App credentials, failing before any network activity when either is blank.
    pub fn credentials(&self) -> Result<Credentials> {
        if self.app_id.trim().is_empty() || self.app_secret.trim().is_empty() {
            return Err(Error::Config(format!(
                "{} and {} are required",
                ENV_APP_ID, ENV_APP_SECRET
            )));
        }

        Ok(Credentials {
            app_id: self.app_id.trim().to_string(),
            app_secret: self.app_secret.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};
    use tempfile::tempdir;

    static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn unset(key: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::remove_var(key);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    fn clear_lark_env() -> Vec<EnvGuard> {
        vec![
            EnvGuard::unset(ENV_APP_ID),
            EnvGuard::unset(ENV_APP_SECRET),
            EnvGuard::unset(ENV_BASE_URL),
        ]
    }

    fn config(app_id: &str, app_secret: &str) -> Config {
        Config {
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_page_size: CHAT_PAGE_SIZE,
            message_page_size: MESSAGE_PAGE_SIZE,
        }
    }

    #[test]
    fn credentials_require_both_values() {
        assert!(matches!(
            config("", "").credentials(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config("cli_a", "  ").credentials(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config("", "secret").credentials(),
            Err(Error::Config(_))
        ));

        let creds = config("cli_a", "secret").credentials().expect("credentials");
        assert_eq!(creds.app_id, "cli_a");
        assert_eq!(creds.app_secret, "secret");
    }

    #[test]
    fn credentials_error_names_env_vars() {
        let err = config("", "").credentials().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("LARK_APP_ID"));
        assert!(msg.contains("LARK_APP_SECRET"));
    }

    #[test]
    fn test_load_from_yaml() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = clear_lark_env();
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            r#"
lark:
  app_id: cli_yaml
  app_secret: yaml_secret
  base_url: https://open.larksuite.com
limits:
  chat_page_size: 10
  message_page_size: 30
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).expect("config");
        assert_eq!(config.app_id, "cli_yaml");
        assert_eq!(config.app_secret, "yaml_secret");
        assert_eq!(config.base_url, "https://open.larksuite.com");
        assert_eq!(config.chat_page_size, 10);
        assert_eq!(config.message_page_size, 30);
    }

    #[test]
    fn env_overrides_yaml_and_fills_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = clear_lark_env();
        let _guards = [
            EnvGuard::set(ENV_APP_ID, "cli_env"),
            EnvGuard::set(ENV_APP_SECRET, "env_secret"),
        ];
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        fs::write(&path, "lark:\n  app_id: cli_yaml\n").unwrap();

        let config = Config::load_from_file(&path).expect("config");
        assert_eq!(config.app_id, "cli_env");
        assert_eq!(config.app_secret, "env_secret");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.chat_page_size, CHAT_PAGE_SIZE);
        assert_eq!(config.message_page_size, MESSAGE_PAGE_SIZE);
    }

    #[test]
    fn env_placeholders_are_resolved_from_environment() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = clear_lark_env();
        let _guard = EnvGuard::set("MY_LARK_SECRET", "from_placeholder");
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "lark:\n  app_id: cli_a\n  app_secret: ${MY_LARK_SECRET}\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).expect("config");
        assert_eq!(config.app_secret, "from_placeholder");
    }

    #[test]
    fn unresolved_placeholder_counts_as_missing() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = clear_lark_env();
        let _unset = EnvGuard::unset("MISSING_LARK_SECRET");
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "lark:\n  app_id: cli_a\n  app_secret: ${MISSING_LARK_SECRET}\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).expect("config");
        assert!(config.credentials().is_err());
    }

    #[test]
    fn load_from_file_fails_on_missing_file() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = clear_lark_env();
        let result = Config::load_from_file("/nonexistent/lark/config.yml");
        assert!(result.unwrap_err().contains("Failed to read config file"));
    }

    #[test]
    fn load_from_file_fails_on_invalid_yaml() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = clear_lark_env();
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        fs::write(&path, "lark: [unclosed").unwrap();

        let result = Config::load_from_file(&path);
        assert!(result.unwrap_err().contains("Failed to parse config file"));
    }

    #[test]
    fn defaults_read_environment() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = clear_lark_env();
        let _guards = [
            EnvGuard::set(ENV_APP_ID, "cli_default"),
            EnvGuard::set(ENV_APP_SECRET, "default_secret"),
            EnvGuard::set(ENV_BASE_URL, "http://127.0.0.1:9"),
        ];

        let config = Config::defaults();
        assert_eq!(config.app_id, "cli_default");
        assert_eq!(config.app_secret, "default_secret");
        assert_eq!(config.base_url, "http://127.0.0.1:9");
    }
}
