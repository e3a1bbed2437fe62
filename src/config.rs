//! Run configuration and persisted user settings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default Ollama endpoint for the local backends.
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Which language model backend evaluates messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote hosted model (OpenAI chat completions).
    OpenAi,
    /// Local quantized llama-2 7B served by Ollama.
    Llama,
    /// Local quantized OpenHermes 2.5 Mistral 7B served by Ollama.
    Hermes,
}

impl BackendKind {
    /// Canonical model identifier, reported in run statistics.
    pub fn model_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4-1106-preview",
            Self::Llama => "llama2:7b",
            Self::Hermes => "openhermes2.5-mistral:7b",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Model identifiers are accepted as aliases for the short names.
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "gpt-4-1106-preview" => Ok(Self::OpenAi),
            "llama" | "llama-2-7b" | "llama2:7b" => Ok(Self::Llama),
            "hermes" | "openhermes-2.5-mistral-7b" | "openhermes2.5-mistral:7b" => {
                Ok(Self::Hermes)
            }
            other => Err(ConfigError::InvalidValue {
                key: "backend".to_string(),
                message: format!("unknown backend '{other}' (expected openai, llama, or hermes)"),
            }),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAi => "openai",
            Self::Llama => "llama",
            Self::Hermes => "hermes",
        };
        write!(f, "{name}")
    }
}

/// What to do with a message the classifier marks ignorable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionMode {
    /// Remove the UNREAD label.
    MarkRead,
    /// Permanently delete the message.
    Delete,
}

impl FromStr for ActionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mark-read" | "read" => Ok(Self::MarkRead),
            "delete" => Ok(Self::Delete),
            other => Err(ConfigError::InvalidValue {
                key: "action".to_string(),
                message: format!("unknown action '{other}' (expected mark-read or delete)"),
            }),
        }
    }
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkRead => write!(f, "mark-read"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Whether a message that cannot be fetched or parsed is recorded in the
/// ledger (never looked at again) or left for the next run to retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnparseablePolicy {
    /// Record the ID so a permanently broken message is not retried forever.
    #[default]
    MarkHandled,
    /// Leave the ID out of the ledger; a transient failure gets another shot.
    RetryNextRun,
}

impl FromStr for UnparseablePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mark-handled" => Ok(Self::MarkHandled),
            "retry" | "retry-next-run" => Ok(Self::RetryNextRun),
            other => Err(ConfigError::InvalidValue {
                key: "unparseable".to_string(),
                message: format!("unknown policy '{other}' (expected mark-handled or retry)"),
            }),
        }
    }
}

/// Persisted convenience settings, offered for reuse on the next run.
///
/// Never required for correctness; environment variables always win. API
/// keys are deliberately not part of this file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub backend: BackendKind,
    pub action: ActionMode,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,
}

impl UserSettings {
    /// Load settings from `path`. An absent file is not an error.
    pub fn load(path: &Path) -> std::result::Result<Option<Self>, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let settings =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(Some(settings))
    }

    /// Persist settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> std::result::Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

/// Fully-resolved configuration for one sweep run.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub backend: BackendKind,
    pub action: ActionMode,
    pub unparseable: UnparseablePolicy,
    pub first_name: String,
    pub last_name: String,
    /// Directory holding per-account ledger files.
    pub cache_dir: PathBuf,
    pub settings_path: PathBuf,
    pub gmail_token: SecretString,
    pub openai_api_key: Option<SecretString>,
    pub ollama_url: String,
}

impl SweepConfig {
    /// Assemble the run configuration from environment variables, falling
    /// back to the persisted settings file where one exists.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let settings_path = env_path("INBOX_SWEEP_SETTINGS", "settings/user_settings.json");
        let saved = UserSettings::load(&settings_path)?;

        let backend = match std::env::var("INBOX_SWEEP_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => saved.as_ref().map(|s| s.backend).ok_or_else(|| {
                ConfigError::MissingRequired {
                    key: "INBOX_SWEEP_BACKEND".to_string(),
                    hint: "Set to one of: openai, llama, hermes.".to_string(),
                }
            })?,
        };

        let action = match std::env::var("INBOX_SWEEP_ACTION") {
            Ok(raw) => raw.parse()?,
            Err(_) => saved
                .as_ref()
                .map(|s| s.action)
                .unwrap_or(ActionMode::MarkRead),
        };

        let unparseable = match std::env::var("INBOX_SWEEP_UNPARSEABLE") {
            Ok(raw) => raw.parse()?,
            Err(_) => UnparseablePolicy::default(),
        };

        let first_name = resolve_name(
            "INBOX_SWEEP_FIRST_NAME",
            saved.as_ref().map(|s| s.first_name.as_str()),
        )?;
        let last_name = resolve_name(
            "INBOX_SWEEP_LAST_NAME",
            saved.as_ref().map(|s| s.last_name.as_str()),
        )?;

        let gmail_token = std::env::var("GMAIL_ACCESS_TOKEN")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar("GMAIL_ACCESS_TOKEN".to_string()))?;

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().map(SecretString::from);
        if backend == BackendKind::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()));
        }

        let ollama_url = std::env::var("OLLAMA_URL")
            .ok()
            .or_else(|| saved.as_ref().and_then(|s| s.ollama_url.clone()))
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            backend,
            action,
            unparseable,
            first_name,
            last_name,
            cache_dir: env_path("INBOX_SWEEP_CACHE_DIR", "cache"),
            settings_path,
            gmail_token,
            openai_api_key,
            ollama_url,
        })
    }

    /// The settings worth persisting for the next run.
    pub fn settings(&self) -> UserSettings {
        UserSettings {
            backend: self.backend,
            action: self.action,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            ollama_url: Some(self.ollama_url.clone()),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn resolve_name(
    key: &str,
    saved: Option<&str>,
) -> std::result::Result<String, ConfigError> {
    if let Ok(value) = std::env::var(key) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    match saved {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(ConfigError::MissingRequired {
            key: key.to_string(),
            hint: "The classification prompt is parameterized by the user's name.".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_parses_short_names() {
        assert_eq!("openai".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!("llama".parse::<BackendKind>().unwrap(), BackendKind::Llama);
        assert_eq!("hermes".parse::<BackendKind>().unwrap(), BackendKind::Hermes);
    }

    #[test]
    fn backend_kind_parses_model_ids() {
        assert_eq!(
            "gpt-4-1106-preview".parse::<BackendKind>().unwrap(),
            BackendKind::OpenAi
        );
        assert_eq!(
            "openhermes-2.5-mistral-7b".parse::<BackendKind>().unwrap(),
            BackendKind::Hermes
        );
    }

    #[test]
    fn backend_kind_rejects_unknown() {
        assert!("mistral-large".parse::<BackendKind>().is_err());
    }

    #[test]
    fn action_mode_parses() {
        assert_eq!("mark-read".parse::<ActionMode>().unwrap(), ActionMode::MarkRead);
        assert_eq!("delete".parse::<ActionMode>().unwrap(), ActionMode::Delete);
        assert!("archive".parse::<ActionMode>().is_err());
    }

    #[test]
    fn unparseable_policy_defaults_to_mark_handled() {
        assert_eq!(UnparseablePolicy::default(), UnparseablePolicy::MarkHandled);
    }

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_settings.json");

        let settings = UserSettings {
            backend: BackendKind::Hermes,
            action: ActionMode::Delete,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ollama_url: Some("http://127.0.0.1:11434".to_string()),
        };
        settings.save(&path).unwrap();

        let loaded = UserSettings::load(&path).unwrap().unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn settings_absent_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = UserSettings::load(&dir.path().join("missing.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn settings_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings/user_settings.json");

        let settings = UserSettings {
            backend: BackendKind::OpenAi,
            action: ActionMode::MarkRead,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ollama_url: None,
        };
        settings.save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn settings_serialization_uses_kebab_case() {
        let settings = UserSettings {
            backend: BackendKind::OpenAi,
            action: ActionMode::MarkRead,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ollama_url: None,
        };
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["backend"], "openai");
        assert_eq!(json["action"], "mark-read");
        assert!(json.get("ollama_url").is_none());
    }
}
