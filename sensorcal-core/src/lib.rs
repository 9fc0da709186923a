//! Sensor acquisition and calibration engine for SensorCal
//!
//! Turns raw converter codes and interrupt pulses into calibrated physical
//! values and publishes them for bounded-wait consumption.
//! Designed for small microcontrollers driven by an RTOS tick.
//!
//! Key constraints:
//! - No heap allocation anywhere in the engine
//! - No unbounded blocking: every wait has a budget
//! - Interrupt-side code is a single atomic increment
//!
//! ```text
//! AdcReader ──► ChannelEngine (smooth → deadband → calibrate) ──┐
//!                                                                ├──► SnapshotPublisher ◄── get_value(id, budget)
//! EdgeListener ──► PulseCounter ──► PulseRateConsumer ──────────┘
//! ```
//!
//! ```no_run
//! use core::time::Duration;
//! use sensorcal_core::{
//!     AcquisitionConfig, AnalogScheduler, MemoryStore, MonotonicTime, PointId, QuantityId,
//!     SnapshotPublisher,
//! };
//! # use sensorcal_core::hal::{AdcReader, ChannelId, HardwareError};
//! # struct Adc;
//! # impl AdcReader for Adc {
//! #     fn read_channel(&mut self, _: ChannelId) -> nb::Result<u16, HardwareError> { Ok(2000) }
//! # }
//!
//! let config = AcquisitionConfig::default();
//! let mut store = MemoryStore::<16>::new();
//! let mut scheduler = AnalogScheduler::<_, 2>::new(Adc, &config).unwrap();
//! scheduler.restore(&store);
//! scheduler.set_point(0, PointId::D0, 500, -10.0, &mut store).unwrap();
//! scheduler.set_point(0, PointId::D1, 3500, 40.0, &mut store).unwrap();
//!
//! let publisher = SnapshotPublisher::<_, 2>::new(MonotonicTime::new(), config.publish_timeout());
//! scheduler.tick(&publisher);
//! let celsius = publisher.get_value(QuantityId::Channel(0), Duration::from_millis(10));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod fmt;

pub mod buffer;
pub mod calibration;
pub mod channel;
pub mod config;
pub mod constants;
pub mod errors;
pub mod filter;
pub mod hal;
pub mod pulse;
pub mod scheduler;
pub mod snapshot;
pub mod time;

// Public API
pub use calibration::{
    CalibrationModel, CalibrationPoint, CalibrationStore, MemoryStore, PhysicalRange, PointId,
    StoreKey,
};
pub use channel::{CalibrationReport, CalibrationState, ChannelEngine, ChannelStatus, TickOutcome};
pub use config::{AcquisitionConfig, PulseConfig, RecalibrationPolicy};
pub use errors::{
    AcquisitionError, CalibrationError, ConfigError, EngineError, EngineResult, PersistenceError,
    PublishError, SnapshotError,
};
pub use filter::{Deadband, MovingAverage};
pub use hal::{AdcReader, ChannelId, EdgeInterrupts, EdgeListener, HardwareError};
pub use pulse::{PulseCounter, PulseOutcome, PulseRateConsumer, PulseStatus};
pub use scheduler::{AnalogScheduler, TickReport};
pub use snapshot::{QuantityId, SnapshotPublisher, SnapshotSlot};
#[cfg(feature = "std")]
pub use time::MonotonicTime;
pub use time::{FixedTime, TimeSource, Timestamp};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
