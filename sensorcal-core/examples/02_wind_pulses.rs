//! Wind Pulse Example
//!
//! Feeds simulated anemometer edges through the interrupt table into the
//! pulse consumer.
//!
//! ## What You'll Learn
//!
//! - Registering a static `PulseCounter` as an edge listener
//! - How the consumer drains the counter once per interval
//! - What idle and implausible intervals look like
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_wind_pulses
//! ```

use std::time::Duration;

use sensorcal_core::{
    constants::pulse::PULSE_GPIO,
    hal::{EdgeInterrupts, EdgeTable},
    AcquisitionConfig, MonotonicTime, PulseCounter, PulseRateConsumer, QuantityId,
    SnapshotPublisher,
};

static WIND: PulseCounter = PulseCounter::new();

fn main() {
    println!("SensorCal Wind Pulse Example");
    println!("============================\n");

    let config = AcquisitionConfig::default();
    let mut table = EdgeTable::<1>::new();
    table.on_edge(PULSE_GPIO, &WIND).expect("free slot");

    let publisher = SnapshotPublisher::<_, 0>::new(MonotonicTime::new(), config.publish_timeout());
    let mut consumer = PulseRateConsumer::new(config.pulse, config.pulse_period());

    // Pulses seen per one-second interval
    for edges in [42u32, 57, 0, 130, 2_000] {
        for _ in 0..edges {
            // What the GPIO interrupt vector would do
            table.dispatch(PULSE_GPIO);
        }
        let outcome = consumer.tick(&WIND, &publisher);
        println!(
            "  {:>5} edges → {:?}, published {:?}",
            edges,
            outcome,
            publisher.get_value(QuantityId::PulseRate, Duration::ZERO)
        );
    }

    println!("\nStatus: {:?}", consumer.status(&WIND));
}
