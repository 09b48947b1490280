use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
/// Which observer channels the console front end logs.
pub struct TraceConfig {
    pub registers: bool,
    pub memory: bool,
    pub instructions: bool,
}

impl TraceConfig {
    pub fn all() -> Self {
        Self {
            registers: true,
            memory: true,
            instructions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Settings for the `ulm` binary, stored as RON.
///
/// ```text
/// (
///     trace: (instructions: true),
///     max_steps: Some(100000),
///     log_filter: "ulm_emulator=debug",
/// )
/// ```
pub struct Config {
    pub trace: TraceConfig,
    /// stop after this many steps, `None` runs until the program halts
    pub max_steps: Option<u64>,
    /// `tracing_subscriber::EnvFilter` directives, `RUST_LOG` wins if set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trace: TraceConfig::default(),
            max_steps: None,
            log_filter: "warn".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

impl Config {
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Read a config file. A file that doesn't exist gives the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(source) => {
                let config = Self::from_ron(&source)?;
                tracing::debug!(path = %path.display(), ?config, "loaded config");
                Ok(config)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn to_ron(&self) -> String {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).unwrap_or_default()
    }
}
