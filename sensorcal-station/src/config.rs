//! Station configuration
//!
//! JSON file, every field optional:
//!
//! ```json
//! {
//!   "acquisition": { "analog_period_ms": 100, "recalibration_policy": "KeepLastValid" },
//!   "wind_gpio": 17,
//!   "store_path": "calibration.json",
//!   "report_interval_ms": 1000
//! }
//! ```
//!
//! The file is found through `SENSORCAL_CONFIG` or the first command-line
//! argument; without either the defaults apply.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sensorcal_core::{constants::pulse::PULSE_GPIO, hal::GpioPin, AcquisitionConfig};

use crate::error::{StationError, StationResult};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "SENSORCAL_CONFIG";

/// Everything the station binary needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Engine settings
    pub acquisition: AcquisitionConfig,
    /// GPIO the anemometer is wired to
    pub wind_gpio: GpioPin,
    /// Calibration store file
    pub store_path: PathBuf,
    /// Console report cadence (ms)
    pub report_interval_ms: u64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            acquisition: AcquisitionConfig::default(),
            wind_gpio: PULSE_GPIO,
            store_path: PathBuf::from("calibration.json"),
            report_interval_ms: 1000,
        }
    }
}

impl StationConfig {
    /// Parse and validate the file at `path`
    pub fn load(path: &Path) -> StationResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| StationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| StationError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.acquisition.validate()?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `SENSORCAL_CONFIG`, else the first argument, else defaults
    pub fn from_env_or_args<I>(args: I) -> StationResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let path = env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| args.into_iter().next().map(PathBuf::from));

        match path {
            Some(path) => Self::load(&path),
            None => {
                log::info!("no configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Console report cadence
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}
