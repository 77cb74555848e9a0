//! Loading and validation of settings.
//!
//! Values defined in the configuration file can be overridden by environment variables with the
//! `FEDROUND_` prefix, where nested keys are separated by `__`. An example configuration file
//! can be found in the `configs/` directory located in the repository root.

use std::{fmt, path::Path};

use config::{Config, ConfigError, Environment};
use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize,
};
use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;
use validator::{Validate, ValidationError, ValidationErrors};

use fedround_core::model::MIN_QUORUM;

use crate::aggregator::DuplicatePolicy;

#[derive(Error, Debug)]
/// An error related to loading and validation of settings.
pub enum SettingsError {
    #[error("configuration loading failed: {0}")]
    Loading(#[from] ConfigError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Default, Validate, Deserialize)]
/// The combined settings.
///
/// Each section in the configuration file corresponds to the identically named settings field.
pub struct Settings {
    #[validate]
    #[serde(default)]
    pub round: RoundSettings,
    #[serde(default)]
    pub log: LoggingSettings,
}

impl Settings {
    /// Loads and validates the settings via a configuration file.
    ///
    /// # Errors
    /// Fails when the loading of the configuration file or its validation failed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let settings: Settings = Self::load(Some(path.as_ref()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads and validates the settings from the defaults and the environment only.
    ///
    /// # Errors
    /// Fails when an environment variable can't be parsed or the validation failed.
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings: Settings = Self::load(None)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix("FEDROUND")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Validate, Deserialize)]
#[validate(schema(function = "validate_round"))]
/// Round settings.
pub struct RoundSettings {
    /// The minimal number of distinct updates a round needs before it can be aggregated.
    ///
    /// The value must be greater or equal to `2` (i.e. `min_updates >= 2`).
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [round]
    /// min_updates = 3
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// FEDROUND_ROUND__MIN_UPDATES=3
    /// ```
    #[serde(default = "default_min_updates")]
    pub min_updates: usize,

    /// What happens when a participant submits a second update in the same round, either
    /// `"overwrite"` to keep the latest one or `"reject"` to keep the first one.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [round]
    /// duplicates = "reject"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// FEDROUND_ROUND__DUPLICATES=reject
    /// ```
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            min_updates: MIN_QUORUM,
            duplicates: DuplicatePolicy::default(),
        }
    }
}

fn default_min_updates() -> usize {
    MIN_QUORUM
}

/// Checks the round invariants.
///
/// The validate attribute only accepts literals, therefore we check the quorum here.
fn validate_round(s: &RoundSettings) -> Result<(), ValidationError> {
    if s.min_updates >= MIN_QUORUM {
        Ok(())
    } else {
        Err(ValidationError::new("min_updates below the minimum quorum"))
    }
}

#[derive(Debug, Deserialize)]
/// Logging settings.
pub struct LoggingSettings {
    /// A comma-separated list of logging directives. More information about logging directives
    /// can be found [here].
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [log]
    /// filter = "info"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// FEDROUND_LOG__FILTER=info
    /// ```
    ///
    /// [here]: https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/filter/struct.EnvFilter.html#directives
    #[serde(deserialize_with = "deserialize_env_filter")]
    pub filter: EnvFilter,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: EnvFilter::new("info"),
        }
    }
}

fn deserialize_env_filter<'de, D>(deserializer: D) -> Result<EnvFilter, D::Error>
where
    D: Deserializer<'de>,
{
    struct EnvFilterVisitor;

    impl<'de> Visitor<'de> for EnvFilterVisitor {
        type Value = EnvFilter;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a valid tracing filter directive: https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/filter/struct.EnvFilter.html#directives")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            EnvFilter::try_new(value)
                .map_err(|_| de::Error::invalid_value(serde::de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_str(EnvFilterVisitor)
}
