use std::path::{Path, PathBuf};

use rxdial_messages::{ReceiverSettings, TunerState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),

    #[error("Failed to write config file {0}: {1}")]
    WriteError(PathBuf, String),
}

/// Everything persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// CSV bookmark table.
    pub freq_list: Option<PathBuf>,
    pub tuner: TunerState,
    pub receiver: ReceiverSettings,
}

/// `<config dir>/rxdial/rxdial.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rxdial").join("rxdial.toml"))
}

impl AppConfig {
    /// A missing file gives the defaults; keys absent from the file take defaults too.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |e: String| ConfigError::WriteError(path.to_path_buf(), e);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| write_err(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxdial_messages::{AgcMode, Hertz, Mode};

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rxdial.toml");

        let mut config = AppConfig::default();
        config.tuner.base_frequency = Hertz(7_074_000);
        config.tuner.mode = Mode::Usb;
        config.receiver.agc_mode = AgcMode::Slow;
        config.receiver.gains.insert("LNA".to_string(), 32.0);
        config.freq_list = Some(PathBuf::from("/tmp/list.csv"));
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rxdial.toml");
        std::fs::write(&path, "[tuner]\nbase_frequency = 14074000\nmode = \"CW_LSB\"\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.tuner.base_frequency, Hertz(14_074_000));
        assert_eq!(config.tuner.mode, Mode::CwLsb);
        assert_eq!(config.tuner.audio_rate, TunerState::default().audio_rate);
        assert_eq!(config.receiver, ReceiverSettings::default());
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rxdial.toml");
        std::fs::write(&path, "[tuner\n").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
        assert!(err.to_string().contains("rxdial.toml"));
    }
}
