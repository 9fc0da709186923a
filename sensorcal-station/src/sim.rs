//! Simulated hardware
//!
//! Stand-ins for the converter and the anemometer so the station runs (and
//! is tested) on a development host. [`SimulatedAdc`] serves codes set
//! through a cloneable [`SimHandle`] and can inject read failures;
//! [`PulseGenerator`] feeds edges into an [`EdgeTable`] at a set rate.

use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sensorcal_core::hal::{AdcReader, ChannelId, EdgeTable, GpioPin, HardwareError};

use crate::driver::PeriodicDriver;
use crate::error::StationResult;

/// Platform code reported for injected failures
pub const SIM_FAULT_CODE: i32 = -1;

#[derive(Debug)]
struct SimState<const N: usize> {
    codes: [AtomicU16; N],
    faults: [AtomicU32; N],
}

/// Converter returning whatever the handle last set
#[derive(Debug)]
pub struct SimulatedAdc<const N: usize> {
    state: Arc<SimState<N>>,
}

/// Control side of a [`SimulatedAdc`]
#[derive(Debug, Clone)]
pub struct SimHandle<const N: usize> {
    state: Arc<SimState<N>>,
}

impl<const N: usize> SimulatedAdc<N> {
    /// Converter with every channel at `code`, plus its handle
    pub fn new(code: u16) -> (Self, SimHandle<N>) {
        let state = Arc::new(SimState {
            codes: std::array::from_fn(|_| AtomicU16::new(code)),
            faults: std::array::from_fn(|_| AtomicU32::new(0)),
        });
        let handle = SimHandle {
            state: Arc::clone(&state),
        };
        (Self { state }, handle)
    }
}

impl<const N: usize> AdcReader for SimulatedAdc<N> {
    fn read_channel(&mut self, channel: ChannelId) -> nb::Result<u16, HardwareError> {
        let ch = usize::from(channel);
        let (Some(code), Some(faults)) = (self.state.codes.get(ch), self.state.faults.get(ch)) else {
            return Err(nb::Error::Other(HardwareError::new(SIM_FAULT_CODE)));
        };
        let injected = faults
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(nb::Error::Other(HardwareError::new(SIM_FAULT_CODE)));
        }
        Ok(code.load(Ordering::Acquire))
    }
}

impl<const N: usize> SimHandle<N> {
    /// Set the code `channel` reads from now on
    pub fn set_code(&self, channel: ChannelId, code: u16) {
        if let Some(slot) = self.state.codes.get(usize::from(channel)) {
            slot.store(code, Ordering::Release);
        }
    }

    /// Make the next `count` reads of `channel` fail
    pub fn inject_failures(&self, channel: ChannelId, count: u32) {
        if let Some(slot) = self.state.faults.get(usize::from(channel)) {
            slot.fetch_add(count, Ordering::AcqRel);
        }
    }
}

/// Edge source emitting on one pin at a fixed rate
#[derive(Debug)]
pub struct PulseGenerator {
    driver: PeriodicDriver,
}

impl PulseGenerator {
    /// Dispatch one edge on `pin` every `interval`
    pub fn start<const T: usize>(
        table: Arc<EdgeTable<T>>,
        pin: GpioPin,
        interval: Duration,
    ) -> StationResult<Self> {
        let driver = PeriodicDriver::spawn("pulse-sim", interval, move || {
            table.dispatch(pin);
        })?;
        Ok(Self { driver })
    }

    /// Stop emitting
    pub async fn stop(self) -> StationResult<u64> {
        self.driver.shutdown().await
    }
}
