//! Layered runtime settings.
//!
//! # Responsibility
//! - Load settings from built-in defaults, an optional TOML file and
//!   prefixed environment variables, in that precedence order.
//! - Reject unusable values before any store is opened.
//!
//! # Invariants
//! - A `Settings` value returned by `load*` has passed `validate()`.

use crate::ids::{
    IdPolicy, DEFAULT_MAX_ID_ATTEMPTS, DEFAULT_NOTE_ID_LENGTH, DEFAULT_USER_ID_LENGTH,
};
use crate::logging::{default_log_level, normalize_level};
use crate::service::user_directory::{CredentialPolicy, MIN_CREDENTIAL_LENGTH};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Settings file looked up in the working directory by `Settings::load`.
pub const DEFAULT_CONFIG_FILE: &str = "sharenote.toml";
/// Environment prefix; nested keys use `__`, e.g. `SHARENOTE_STORAGE__PATH`.
pub const ENV_PREFIX: &str = "SHARENOTE";

const DEFAULT_STORAGE_PATH: &str = "sharenote.db";
const MIN_ID_LENGTH: usize = 6;
const MAX_ID_LENGTH: usize = 64;

#[derive(Debug)]
pub enum SettingsError {
    Config(ConfigError),
    Invalid(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "failed to load settings: {err}"),
            Self::Invalid(message) => write!(f, "invalid settings: {message}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<ConfigError> for SettingsError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Which persistence backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Sqlite,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IdSettings {
    pub note_length: usize,
    pub user_length: usize,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CredentialSettings {
    pub min_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
    pub ids: IdSettings,
    pub credentials: CredentialSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: StorageSettings {
                backend: StorageKind::Sqlite,
                path: PathBuf::from(DEFAULT_STORAGE_PATH),
            },
            logging: LoggingSettings {
                level: default_log_level().to_string(),
                dir: None,
            },
            ids: IdSettings {
                note_length: DEFAULT_NOTE_ID_LENGTH,
                user_length: DEFAULT_USER_ID_LENGTH,
                max_attempts: DEFAULT_MAX_ID_ATTEMPTS,
            },
            credentials: CredentialSettings {
                min_length: MIN_CREDENTIAL_LENGTH,
            },
        }
    }
}

impl Settings {
    /// Loads `sharenote.toml` (if present) and `SHARENOTE_*` variables.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_with(Some(Path::new(DEFAULT_CONFIG_FILE)), ENV_PREFIX)
    }

    /// Loads from an explicit optional file and environment prefix.
    pub fn load_with(file: Option<&Path>, env_prefix: &str) -> Result<Self, SettingsError> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("storage.backend", "sqlite")?
            .set_default("storage.path", DEFAULT_STORAGE_PATH)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("ids.note_length", to_config_int(defaults.ids.note_length))?
            .set_default("ids.user_length", to_config_int(defaults.ids.user_length))?
            .set_default("ids.max_attempts", i64::from(defaults.ids.max_attempts))?
            .set_default(
                "credentials.min_length",
                to_config_int(defaults.credentials.min_length),
            )?;

        if let Some(file) = file {
            builder = builder.add_source(
                File::from(file)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.storage.path.as_os_str().is_empty() {
            return Err(SettingsError::Invalid("storage.path must not be empty".into()));
        }
        normalize_level(&self.logging.level).map_err(|level| {
            SettingsError::Invalid(format!(
                "logging.level `{level}` is not one of trace|debug|info|warn|error"
            ))
        })?;
        if let Some(dir) = self.logging.dir.as_ref() {
            if !dir.is_absolute() {
                return Err(SettingsError::Invalid(format!(
                    "logging.dir must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        if !(MIN_ID_LENGTH..=MAX_ID_LENGTH).contains(&self.ids.note_length) {
            return Err(SettingsError::Invalid(format!(
                "ids.note_length must be within {MIN_ID_LENGTH}..={MAX_ID_LENGTH}"
            )));
        }
        if !(MIN_ID_LENGTH..=MAX_ID_LENGTH).contains(&self.ids.user_length) {
            return Err(SettingsError::Invalid(format!(
                "ids.user_length must be within {MIN_ID_LENGTH}..={MAX_ID_LENGTH}"
            )));
        }
        if self.ids.max_attempts == 0 {
            return Err(SettingsError::Invalid("ids.max_attempts must be positive".into()));
        }
        if self.credentials.min_length == 0 {
            return Err(SettingsError::Invalid(
                "credentials.min_length must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn note_id_policy(&self) -> IdPolicy {
        IdPolicy {
            length: self.ids.note_length,
            max_attempts: self.ids.max_attempts,
        }
    }

    pub fn user_id_policy(&self) -> IdPolicy {
        IdPolicy {
            length: self.ids.user_length,
            max_attempts: self.ids.max_attempts,
        }
    }

    pub fn credential_policy(&self) -> CredentialPolicy {
        CredentialPolicy {
            min_length: self.credentials.min_length,
        }
    }
}

fn to_config_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::{Settings, SettingsError, StorageKind};
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.toml");
        let settings = Settings::load_with(Some(absent.as_path()), "SHARENOTE_TEST_DEFAULTS").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.storage.backend, StorageKind::Sqlite);
        assert_eq!(settings.ids.note_length, 8);
        assert_eq!(settings.credentials.min_length, 4);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sharenote.toml");
        fs::write(
            &path,
            "[storage]\nbackend = \"json\"\npath = \"data/db.json\"\n\n[ids]\nnote_length = 12\n",
        )
        .unwrap();

        let settings = Settings::load_with(Some(path.as_path()), "SHARENOTE_TEST_FILE").unwrap();
        assert_eq!(settings.storage.backend, StorageKind::Json);
        assert_eq!(settings.storage.path, PathBuf::from("data/db.json"));
        assert_eq!(settings.note_id_policy().length, 12);
        assert_eq!(settings.user_id_policy().length, 10);
    }

    #[test]
    fn environment_overrides_file() {
        std::env::set_var("SHARENOTE_TEST_ENV_CREDENTIALS__MIN_LENGTH", "6");
        let settings = Settings::load_with(None, "SHARENOTE_TEST_ENV").unwrap();
        std::env::remove_var("SHARENOTE_TEST_ENV_CREDENTIALS__MIN_LENGTH");
        assert_eq!(settings.credential_policy().min_length, 6);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sharenote.toml");

        fs::write(&path, "[storage]\nbackend = \"postgres\"\n").unwrap();
        assert!(matches!(
            Settings::load_with(Some(path.as_path()), "SHARENOTE_TEST_INVALID"),
            Err(SettingsError::Config(_))
        ));

        fs::write(&path, "[ids]\nnote_length = 2\n").unwrap();
        assert!(matches!(
            Settings::load_with(Some(path.as_path()), "SHARENOTE_TEST_INVALID"),
            Err(SettingsError::Invalid(_))
        ));

        fs::write(&path, "[logging]\ndir = \"relative/logs\"\n").unwrap();
        assert!(matches!(
            Settings::load_with(Some(path.as_path()), "SHARENOTE_TEST_INVALID"),
            Err(SettingsError::Invalid(_))
        ));
    }
}
