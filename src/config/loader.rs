use config::{Config, Environment, File};

use crate::config::AppConfig;
use crate::error::{Error, Result};

impl AppConfig {
    /// Load configuration from `config/default.toml` (optional), an optional
    /// per-environment file, and `BOT__*` environment variables, with the
    /// environment taking precedence.
    pub fn load(env: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::with_name("config/default").required(false));
        if let Some(env) = env {
            builder = builder.add_source(File::with_name(&format!("config/{}", env)).required(false));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("BOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Missing Telegram credentials are fatal at startup, before any loop is
    /// entered.
    pub fn validate_credentials(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(Error::MissingCredential("telegram.bot_token"));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(Error::MissingCredential("telegram.chat_id"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramConfig;

    #[test]
    fn missing_credentials_are_rejected() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate_credentials(),
            Err(Error::MissingCredential("telegram.bot_token"))
        ));

        let config = AppConfig {
            telegram: TelegramConfig {
                bot_token: "123:abc".to_string(),
                chat_id: String::new(),
            },
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate_credentials(),
            Err(Error::MissingCredential("telegram.chat_id"))
        ));
    }

    #[test]
    fn complete_credentials_pass() {
        let config = AppConfig {
            telegram: TelegramConfig {
                bot_token: "123:abc".to_string(),
                chat_id: "-100123".to_string(),
            },
            ..AppConfig::default()
        };
        assert!(config.validate_credentials().is_ok());
    }
}
