//! Station lifecycle against simulated hardware
//!
//! All tests run on a paused Tokio clock, so driver cadences are exact and
//! nothing ticks between two synchronous calls.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use sensorcal_core::{
    hal::EdgeTable, AcquisitionConfig, CalibrationPoint, CalibrationState, CalibrationStore,
    EdgeInterrupts, EngineError, MemoryStore, PersistenceError, PointId, PulseCounter, QuantityId,
    SnapshotError, StoreKey,
};
use sensorcal_station::{
    console, Command, JsonFileStore, PulseGenerator, SimulatedAdc, Station, StationError,
};
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn publishes_only_after_both_points_are_set() {
    static COUNTER: PulseCounter = PulseCounter::new();
    let (adc, _sim) = SimulatedAdc::<2>::new(2000);
    let station =
        Station::<_, _, 2>::start(AcquisitionConfig::default(), adc, MemoryStore::<16>::new(), &COUNTER).unwrap();
    assert!(station.is_running());

    sleep(Duration::from_millis(550)).await;
    assert!(matches!(
        station.read(QuantityId::Channel(0)),
        Err(StationError::Snapshot(SnapshotError::Empty))
    ));

    let report = station.set_point(0, PointId::D0, 500, -10.0).unwrap();
    assert_eq!(report.state, CalibrationState::Uncalibrated);
    let report = station.set_point(0, PointId::D1, 3500, 40.0).unwrap();
    assert_eq!(report.state, CalibrationState::Calibrated);

    sleep(Duration::from_millis(1000)).await;
    let status = station.status(0).unwrap();
    assert_eq!(status.state, CalibrationState::Calibrated);
    assert_eq!(status.last_filtered, Some(1992));
    let value = station.read(QuantityId::Channel(0)).unwrap();
    assert_eq!(Some(value), status.last_value);
    assert!((value - 1992.0 * 50.0 / 3000.0).abs() < 1e-3);

    // Channel 1 was never touched
    assert_eq!(station.status(1).unwrap().state, CalibrationState::Uncalibrated);

    station.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn live_calibration_survives_restart() {
    static COUNTER: PulseCounter = PulseCounter::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calibration.json");

    {
        let (adc, sim) = SimulatedAdc::<2>::new(0);
        let store = JsonFileStore::open(&path).unwrap();
        let station = Station::<_, _, 2>::start(AcquisitionConfig::default(), adc, store, &COUNTER).unwrap();

        sim.set_code(1, 800);
        station.calibrate(1, PointId::D0, -5.0).unwrap();
        sim.set_code(1, 3000);
        let report = station.calibrate(1, PointId::D1, 30.0).unwrap();
        assert_eq!(report.state, CalibrationState::Calibrated);
        assert_eq!(report.recompute, Ok(35.0 / 2200.0));

        station.shutdown().await.unwrap();
    }

    let (adc, _sim) = SimulatedAdc::<2>::new(0);
    let store = JsonFileStore::open(&path).unwrap();
    assert_eq!(store.len(), 2);
    let station = Station::<_, _, 2>::start(AcquisitionConfig::default(), adc, store, &COUNTER).unwrap();

    assert_eq!(station.status(1).unwrap().state, CalibrationState::Calibrated);
    assert_eq!(station.status(0).unwrap().state, CalibrationState::Uncalibrated);
    let stored = station.stored_calibration(1).unwrap();
    assert_eq!(stored.d0.map(|p| (p.code, p.value)), Ok((800, -5.0)));
    assert_eq!(stored.d1.map(|p| (p.code, p.value)), Ok((3000, 30.0)));
    assert_eq!(
        stored.d0.map(|p| p.generation),
        stored.d1.map(|p| p.generation)
    );

    station.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn rejected_point_leaves_store_untouched() {
    static COUNTER: PulseCounter = PulseCounter::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calibration.json");
    let (adc, _sim) = SimulatedAdc::<2>::new(1000);
    let store = JsonFileStore::open(&path).unwrap();
    let station = Station::<_, _, 2>::start(AcquisitionConfig::default(), adc, store, &COUNTER).unwrap();

    // 90 °C is outside the default -30..40 range
    let result = station.set_point(0, PointId::D1, 3500, 90.0);
    assert!(matches!(result, Err(StationError::Engine(EngineError::Calibration(_)))));
    assert!(!path.exists());

    let result = station.set_point(7, PointId::D0, 100, 0.0);
    assert!(matches!(
        result,
        Err(StationError::Engine(EngineError::UnknownChannel { channel: 7, .. }))
    ));

    station.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn transient_read_failures_keep_the_last_value() {
    static COUNTER: PulseCounter = PulseCounter::new();
    let (adc, sim) = SimulatedAdc::<2>::new(2000);
    let station =
        Station::<_, _, 2>::start(AcquisitionConfig::default(), adc, MemoryStore::<16>::new(), &COUNTER).unwrap();
    station.set_point(0, PointId::D0, 500, -10.0).unwrap();
    station.set_point(0, PointId::D1, 3500, 40.0).unwrap();

    sleep(Duration::from_millis(1000)).await;
    let before = station.read(QuantityId::Channel(0)).unwrap();

    sim.inject_failures(0, 3);
    sleep(Duration::from_millis(450)).await;
    let status = station.status(0).unwrap();
    assert_eq!(status.acquisition_errors, 3);
    assert_eq!(station.read(QuantityId::Channel(0)).unwrap(), before);

    station.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn generated_pulses_become_a_rate() {
    static COUNTER: PulseCounter = PulseCounter::new();
    let config = AcquisitionConfig::default();

    let mut edges = EdgeTable::<1>::new();
    edges.on_edge(17, &COUNTER).unwrap();
    let generator = PulseGenerator::start(Arc::new(edges), 17, Duration::from_millis(100)).unwrap();

    let (adc, _sim) = SimulatedAdc::<2>::new(0);
    let station = Station::<_, _, 2>::start(config, adc, MemoryStore::<16>::new(), &COUNTER).unwrap();

    sleep(Duration::from_millis(1050)).await;

    // Ten edges per second at 0.1 per pulse; the first interval may gain or
    // lose the edge that coincides with its boundary
    let rate = station.read(QuantityId::PulseRate).unwrap();
    assert!((0.85..=1.15).contains(&rate), "rate {}", rate);
    let status = station.pulse_status();
    assert_eq!(status.last_rate, Some(rate));
    assert_eq!(status.implausible, 0);

    generator.stop().await.unwrap();
    station.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_publishing() {
    static COUNTER: PulseCounter = PulseCounter::new();
    let (adc, sim) = SimulatedAdc::<2>::new(2000);
    let station =
        Station::<_, _, 2>::start(AcquisitionConfig::default(), adc, MemoryStore::<16>::new(), &COUNTER).unwrap();
    station.set_point(0, PointId::D0, 500, -10.0).unwrap();
    station.set_point(0, PointId::D1, 3500, 40.0).unwrap();
    sleep(Duration::from_millis(1000)).await;

    let publisher = station.publisher();
    let before = publisher.get_value(QuantityId::Channel(0), Duration::ZERO).unwrap();
    station.shutdown().await.unwrap();

    sim.set_code(0, 3000);
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(
        publisher.get_value(QuantityId::Channel(0), Duration::ZERO),
        Ok(before)
    );
}

#[tokio::test(start_paused = true)]
async fn console_commands_drive_the_station() {
    static COUNTER: PulseCounter = PulseCounter::new();
    let (adc, _sim) = SimulatedAdc::<2>::new(2000);
    let station =
        Station::<_, _, 2>::start(AcquisitionConfig::default(), adc, MemoryStore::<16>::new(), &COUNTER).unwrap();

    let run = |line: &str| console::execute(&station, line.parse::<Command>().unwrap());

    assert!(run("get 0").starts_with("error:"));
    assert_eq!(run("set 0 d0 500 -10"), "ch0 uncalibrated: Err(MissingPoint { point: D1 })");
    assert!(run("set 0 d1 3500 40").starts_with("ch0 calibrated: Ok("));
    assert!(run("set 4 d1 3500 40").starts_with("error: engine: unknown channel 4"));

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(run("get 0"), "33.20");
    assert!(run("status 0").starts_with("ch0 calibrated\n"));
    assert!(run("flash 0").contains("code: 3500"));

    station.shutdown().await.unwrap();
}

/// Store whose writes wait until the test lets them through
struct GatedStore {
    inner: MemoryStore<16>,
    entered: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
}

impl CalibrationStore for GatedStore {
    fn get(&self, key: StoreKey) -> Result<CalibrationPoint, PersistenceError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: StoreKey, point: CalibrationPoint) -> Result<(), PersistenceError> {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        self.inner.set(key, point)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_store_write_does_not_stall_sampling() {
    static COUNTER: PulseCounter = PulseCounter::new();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let store = GatedStore {
        inner: MemoryStore::new(),
        entered: entered_tx,
        release: release_rx,
    };
    let (adc, sim) = SimulatedAdc::<2>::new(1000);
    let station =
        Arc::new(Station::<_, _, 2>::start(AcquisitionConfig::default(), adc, store, &COUNTER).unwrap());

    let writer = {
        let station = Arc::clone(&station);
        thread::spawn(move || station.set_point(0, PointId::D0, 500, -10.0))
    };
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // The write is parked inside the store; new codes must still be sampled
    sim.set_code(0, 3000);
    let (seen_tx, seen_rx) = mpsc::channel();
    let watcher = {
        let station = Arc::clone(&station);
        thread::spawn(move || loop {
            if matches!(station.status(0), Ok(s) if s.last_raw == Some(3000)) {
                let _ = seen_tx.send(());
                break;
            }
            thread::sleep(Duration::from_millis(10));
        })
    };
    let sampled = seen_rx.recv_timeout(Duration::from_secs(2));

    release_tx.send(()).unwrap();
    let report = writer.join().unwrap().unwrap();
    watcher.join().unwrap();
    assert!(sampled.is_ok(), "analog tick waited for the store write");
    assert_eq!(report.state, CalibrationState::Uncalibrated);
    assert_eq!(station.stored_calibration(0).unwrap().d0.map(|p| p.code), Ok(500));

    Arc::try_unwrap(station).unwrap().shutdown().await.unwrap();
}
