use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{error, info, warn};
use sensorcal_core::constants::adc::ANALOG_CHANNEL_COUNT as CHANNELS;
use sensorcal_core::hal::EdgeTable;
use sensorcal_core::{AdcReader, CalibrationStore, EdgeInterrupts, PulseCounter, QuantityId};
use sensorcal_station::{
    console, Command, JsonFileStore, PulseGenerator, SimulatedAdc, Station, StationConfig, StationError,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};

const SIM_START_CODE: u16 = 2048;
const SIM_PULSE_INTERVAL: Duration = Duration::from_millis(250);

static WIND: PulseCounter = PulseCounter::new();

fn report<A, S>(station: &Station<A, S, CHANNELS>)
where
    A: AdcReader + Send + 'static,
    S: CalibrationStore + Send + 'static,
{
    for channel in 0..CHANNELS as u8 {
        match station.read(QuantityId::Channel(channel)) {
            Ok(value) => info!("ch{}: {:.2}", channel, value),
            Err(err) => info!("ch{}: {}", channel, err),
        }
    }
    match station.read(QuantityId::PulseRate) {
        Ok(rate) => info!("wind: {:.1}", rate),
        Err(err) => info!("wind: {}", err),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = StationConfig::from_env_or_args(std::env::args().skip(1))
        .context("loading configuration")?;
    let store = JsonFileStore::open(&config.store_path).context("opening calibration store")?;

    let (adc, _sim) = SimulatedAdc::<CHANNELS>::new(SIM_START_CODE);

    let mut edges = EdgeTable::<1>::new();
    edges
        .on_edge(config.wind_gpio, &WIND)
        .map_err(StationError::from)
        .context("registering wind pulse input")?;
    let generator = PulseGenerator::start(Arc::new(edges), config.wind_gpio, SIM_PULSE_INTERVAL)?;

    let station = Station::start(config.acquisition, adc, store, &WIND)?;
    info!("station running, {} analog channels", CHANNELS);

    let mut ticker = interval(config.report_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            _ = ticker.tick() => report(&station),
            line = lines.next_line(), if console_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => println!("{}", console::execute(&station, command)),
                    Err(err) => println!("{}", err),
                },
                Ok(None) => console_open = false,
                Err(err) => {
                    warn!("console closed: {}", err);
                    console_open = false;
                }
            },
        }
    }

    if let Err(err) = generator.stop().await {
        error!("{}", err);
    }
    station.shutdown().await?;
    info!("stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorcal_core::{AcquisitionConfig, MemoryStore};

    #[tokio::test(start_paused = true)]
    async fn station_polls_the_configured_channel_count() {
        static COUNTER: PulseCounter = PulseCounter::new();
        let (adc, _sim) = SimulatedAdc::<CHANNELS>::new(SIM_START_CODE);
        let station =
            Station::start(AcquisitionConfig::default(), adc, MemoryStore::<16>::new(), &COUNTER).unwrap();

        let last = (CHANNELS - 1) as u8;
        assert!(station.status(last).is_ok());
        assert!(station.status(last + 1).is_err());
        report(&station);

        station.shutdown().await.unwrap();
    }
}
