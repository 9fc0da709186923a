//! Shared fixtures for the integration tests
//!
//! - Scripted and shared converters
//! - Calibrated-scheduler builders
//! - Wait-budget helpers

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sensorcal_core::{
    hal::{AdcReader, ChannelId, HardwareError},
    AcquisitionConfig, AnalogScheduler, MemoryStore, PointId, SnapshotPublisher, TimeSource,
};

/// Converter returning queued results per channel, then a steady code
#[derive(Debug, Default)]
pub struct ScriptedAdc {
    queued: [VecDeque<nb::Result<u16, HardwareError>>; 4],
    steady: [u16; 4],
}

impl ScriptedAdc {
    /// Every channel reads `code`
    pub fn steady(code: u16) -> Self {
        Self {
            steady: [code; 4],
            ..Self::default()
        }
    }

    /// Queue one result for `channel`
    pub fn push(&mut self, channel: ChannelId, result: nb::Result<u16, HardwareError>) {
        self.queued[usize::from(channel)].push_back(result);
    }

    /// Change the steady code of `channel`
    pub fn set_steady(&mut self, channel: ChannelId, code: u16) {
        self.steady[usize::from(channel)] = code;
    }
}

impl AdcReader for ScriptedAdc {
    fn read_channel(&mut self, channel: ChannelId) -> nb::Result<u16, HardwareError> {
        let ch = usize::from(channel);
        self.queued[ch].pop_front().unwrap_or(Ok(self.steady[ch]))
    }
}

/// Converter whose codes can be changed from another thread
#[derive(Debug, Clone, Default)]
pub struct SharedAdc {
    codes: Arc<Mutex<[u16; 4]>>,
}

impl SharedAdc {
    pub fn set(&self, channel: ChannelId, code: u16) {
        self.codes.lock().unwrap()[usize::from(channel)] = code;
    }
}

impl AdcReader for SharedAdc {
    fn read_channel(&mut self, channel: ChannelId) -> nb::Result<u16, HardwareError> {
        Ok(self.codes.lock().unwrap()[usize::from(channel)])
    }
}

/// Two-channel scheduler with channel 0 calibrated to (500, -10) / (3500, 40)
pub fn calibrated_scheduler<A: AdcReader>(
    adc: A,
    config: &AcquisitionConfig,
    store: &mut MemoryStore<16>,
) -> AnalogScheduler<A, 2> {
    let mut scheduler = AnalogScheduler::new(adc, config).unwrap();
    scheduler.set_point(0, PointId::D0, 500, -10.0, store).unwrap();
    scheduler.set_point(0, PointId::D1, 3500, 40.0, store).unwrap();
    scheduler
}

/// Publisher for two channels using `clock`
pub fn publisher<C: TimeSource>(clock: C) -> SnapshotPublisher<C, 2> {
    SnapshotPublisher::new(clock, Duration::from_millis(10))
}

/// Slope of the standard calibration
pub const STANDARD_SLOPE: f32 = 50.0 / 3000.0;
