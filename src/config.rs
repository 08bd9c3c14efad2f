//! Configuration loading: listen/secrets TOML plus bridge feature flags.
//!
//! Two files, loaded once at startup and read-only afterwards:
//!
//! - the secrets file (TOML): listen address/port and the Telegram bot
//!   token. Absent file generates an annotated `<path>.example` and fails
//!   startup - the bridge cannot run without a token.
//! - the flags file (JSON): three booleans steering username/mention
//!   translation. Absent file is created with defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse secrets config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to parse flags file: {0}")]
    FlagsParse(#[from] serde_json::Error),
    #[error("secrets config missing; wrote example to {example}")]
    MissingSecrets {
        /// Path of the generated example file.
        example: String,
    },
}

/// Secrets and listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Secrets {
    /// IRC listener settings.
    pub irc: IrcConfig,
    /// Telegram account settings.
    pub telegram: TelegramConfig,
}

/// IRC listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    /// Address to listen on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Port to listen on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

/// Telegram account settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub token: String,
}

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    6667
}

const SECRETS_EXAMPLE: &str = r#"# tgbridged secrets configuration.
# Fill this out and rename it, dropping the .example suffix.

[irc]
listen_address = "127.0.0.1"
listen_port = 6667

[telegram]
# Bot token from @BotFather.
token = "replace-with-telegram-bot-token"
"#;

impl Secrets {
    /// Load the secrets file, or generate an example and fail.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            let example = format!("{}.example", path.display());
            std::fs::write(&example, SECRETS_EXAMPLE)?;
            return Err(ConfigError::MissingSecrets { example });
        }
        let content = std::fs::read_to_string(path)?;
        let secrets: Secrets = toml::from_str(&content)?;
        Ok(secrets)
    }
}

/// Translation feature flags.
///
/// Field names serialize to the camelCase keys of the original flags file,
/// so an existing configuration keeps working.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    /// Show Telegram usernames to the IRC client with a leading `@`.
    /// Lets the bot ping people, which bypasses Telegram's block feature.
    pub prefix_telegram_usernames_with_at_sign: bool,
    /// Remove literal `@` characters from outgoing bot text to prevent
    /// accidental pings.
    pub strip_all_at_signs_from_bot_text: bool,
    /// Re-insert a mention marker in front of words matching known handles
    /// in the destination's scope. Overrides the stripping above for those
    /// words.
    pub force_convert_usernames_to_at_usernames: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            prefix_telegram_usernames_with_at_sign: false,
            strip_all_at_signs_from_bot_text: true,
            force_convert_usernames_to_at_usernames: false,
        }
    }
}

impl FeatureFlags {
    /// Load the flags file, creating it with defaults when absent.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            let flags = Self::default();
            std::fs::write(path, serde_json::to_string_pretty(&flags)?)?;
            warn!(path = %path.display(), "Flags file absent, created defaults");
            return Ok(flags);
        }
        let content = std::fs::read_to_string(path)?;
        let flags: FeatureFlags = serde_json::from_str(&content)?;
        info!(path = %path.display(), "Loaded flags");
        Ok(flags)
    }

    /// The prefix shown in front of Telegram handles on the IRC side.
    pub fn handle_prefix(&self) -> &'static str {
        if self.prefix_telegram_usernames_with_at_sign {
            "@"
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_parse() {
        let secrets: Secrets = toml::from_str(
            r#"
            [irc]
            listen_port = 65445

            [telegram]
            token = "123:abc"
            "#,
        )
        .unwrap();
        assert_eq!(secrets.irc.listen_address, "127.0.0.1");
        assert_eq!(secrets.irc.listen_port, 65445);
        assert_eq!(secrets.telegram.token, "123:abc");
    }

    #[test]
    fn missing_secrets_writes_example() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");

        let err = Secrets::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecrets { .. }));
        assert!(dir.path().join("bridge.toml.example").exists());
    }

    #[test]
    fn flags_use_original_json_keys() {
        let flags: FeatureFlags = serde_json::from_str(
            r#"{
                "prefixTelegramUsernamesWithAtSign": true,
                "stripAllAtSignsFromBotText": false,
                "forceConvertUsernamesToAtUsernames": true
            }"#,
        )
        .unwrap();
        assert!(flags.prefix_telegram_usernames_with_at_sign);
        assert!(!flags.strip_all_at_signs_from_bot_text);
        assert!(flags.force_convert_usernames_to_at_usernames);
        assert_eq!(flags.handle_prefix(), "@");
    }

    #[test]
    fn flags_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configuration.json");

        let flags = FeatureFlags::load_or_create(&path).unwrap();
        assert!(!flags.prefix_telegram_usernames_with_at_sign);
        assert!(flags.strip_all_at_signs_from_bot_text);
        assert!(path.exists());

        // Second load reads the file back identically.
        let reloaded = FeatureFlags::load_or_create(&path).unwrap();
        assert_eq!(
            reloaded.strip_all_at_signs_from_bot_text,
            flags.strip_all_at_signs_from_bot_text
        );
    }
}
