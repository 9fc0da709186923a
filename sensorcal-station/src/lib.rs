//! Hosted runtime for the SensorCal engine
//!
//! `sensorcal-core` holds the acquisition and calibration logic and never
//! touches a clock thread, a file or a socket. This crate supplies those on a
//! development host or an embedded Linux board:
//!
//! - [`driver`]: Tokio tasks ticking the analog scheduler and the pulse
//!   consumer on their own periods
//! - [`store`]: calibration anchors in a JSON file
//! - [`config`]: station settings from a JSON file
//! - [`sim`]: simulated converter and anemometer
//! - [`station`]: the facade tying them together
//! - [`console`]: the line commands of the `sensorcal-station` binary
//!
//! ```no_run
//! use sensorcal_core::{AcquisitionConfig, MemoryStore, PulseCounter, QuantityId};
//! use sensorcal_station::{SimulatedAdc, Station};
//!
//! static WIND: PulseCounter = PulseCounter::new();
//!
//! # async fn run() -> Result<(), sensorcal_station::StationError> {
//! let (adc, sim) = SimulatedAdc::<2>::new(2000);
//! let station = Station::<_, _, 2>::start(AcquisitionConfig::default(), adc, MemoryStore::<16>::new(), &WIND)?;
//!
//! station.set_point(0, sensorcal_core::PointId::D0, 500, -10.0)?;
//! station.set_point(0, sensorcal_core::PointId::D1, 3500, 40.0)?;
//! sim.set_code(0, 2100);
//!
//! let temperature = station.read(QuantityId::Channel(0))?;
//! # let _ = temperature;
//! station.shutdown().await
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod console;
pub mod driver;
pub mod error;
pub mod sim;
pub mod station;
pub mod store;

pub use config::StationConfig;
pub use console::{Command, CommandError};
pub use driver::PeriodicDriver;
pub use error::{StationError, StationResult};
pub use sim::{PulseGenerator, SimHandle, SimulatedAdc};
pub use station::Station;
pub use store::JsonFileStore;
