//! Channel Calibration Example
//!
//! Walks one thermistor channel from power-up to calibrated output.
//!
//! ## What You'll Learn
//!
//! - How the zero-filled moving average biases the first samples
//! - How the deadband quantises small fluctuations
//! - Writing two calibration points and reading the derived slope
//! - Why nothing is published until the model is valid
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_channel_calibration
//! ```

use std::time::Duration;

use sensorcal_core::{
    hal::{AdcReader, ChannelId, HardwareError},
    AcquisitionConfig, AnalogScheduler, MemoryStore, MonotonicTime, PointId, QuantityId,
    SnapshotPublisher,
};

/// Thermistor divider sitting at a fixed code with a little noise
struct Thermistor {
    code: u16,
    tick: u16,
}

impl AdcReader for Thermistor {
    fn read_channel(&mut self, _channel: ChannelId) -> nb::Result<u16, HardwareError> {
        self.tick = self.tick.wrapping_add(1);
        // ±3 codes of noise
        Ok(self.code + self.tick % 7 - 3)
    }
}

fn main() {
    println!("SensorCal Channel Calibration Example");
    println!("=====================================\n");

    let config = AcquisitionConfig::default();
    let mut store = MemoryStore::<16>::new();
    let mut scheduler = AnalogScheduler::<_, 1>::new(Thermistor { code: 2048, tick: 0 }, &config)
        .expect("default config is valid");
    let publisher = SnapshotPublisher::<_, 1>::new(MonotonicTime::new(), config.publish_timeout());

    println!("Uncalibrated warm-up:");
    for tick in 0..6 {
        scheduler.tick(&publisher);
        let status = scheduler.status(0).expect("channel 0 exists");
        println!(
            "  tick {}: raw {:?} filtered {:?} band {:?} state {}",
            tick, status.last_raw, status.last_filtered, status.band, status.state
        );
    }
    println!(
        "  published: {:?}\n",
        publisher.get_value(QuantityId::Channel(0), Duration::ZERO)
    );

    println!("Calibrating with (500, -10.0) and (3500, 40.0):");
    scheduler
        .set_point(0, PointId::D0, 500, -10.0, &mut store)
        .expect("point accepted");
    let report = scheduler
        .set_point(0, PointId::D1, 3500, 40.0, &mut store)
        .expect("point accepted");
    println!("  state {} recompute {:?}", report.state, report.recompute);

    println!("\nOut-of-range point is rejected:");
    match scheduler.set_point(0, PointId::D1, 3500, 85.0, &mut store) {
        Ok(_) => println!("  accepted?"),
        Err(e) => println!("  {}", e),
    }

    println!("\nCalibrated output:");
    for _ in 0..5 {
        scheduler.tick(&publisher);
        println!(
            "  {:?}",
            publisher.get_value(QuantityId::Channel(0), Duration::from_millis(10))
        );
    }

    println!("\nStored anchors: {:?}", scheduler.stored_calibration(0, &store));
}
