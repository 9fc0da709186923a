//! Property tests for the filter pipeline and the calibration model

mod common;

use std::time::Duration;

use proptest::prelude::*;
use sensorcal_core::{
    AcquisitionConfig, CalibrationModel, ChannelEngine, Deadband, FixedTime, MemoryStore,
    MovingAverage, PhysicalRange, PointId, QuantityId, SnapshotError, SnapshotPublisher,
    TickOutcome,
};

use common::ScriptedAdc;

const MAX_CODE: u16 = 4095;
const RANGE: PhysicalRange = PhysicalRange::new(-30.0, 40.0);

fn code() -> impl Strategy<Value = u16> {
    0..=MAX_CODE
}

fn value() -> impl Strategy<Value = f32> {
    prop_oneof![
        8 => -30.0f32..=40.0,
        1 => -100.0f32..-30.0,
        1 => 40.0f32..100.0,
    ]
}

proptest! {
    #[test]
    fn smooth_is_truncating_mean_of_last_k(samples in prop::collection::vec(code(), 1..64)) {
        const K: usize = 5;
        let mut avg = MovingAverage::<K>::new();
        let mut history = vec![0u16; K];

        for raw in samples {
            history.push(raw);
            let window = &history[history.len() - K..];
            let expected = window.iter().map(|&c| u32::from(c)).sum::<u32>() / K as u32;
            prop_assert_eq!(u32::from(avg.smooth(raw)), expected);
        }
    }

    #[test]
    fn deadband_holds_inside_and_recentres_outside(
        delta in 1u16..64,
        inputs in prop::collection::vec(code(), 1..64),
    ) {
        let mut band = Deadband::new(delta, MAX_CODE);
        let mut last_output = 0u16;

        for input in inputs {
            let before = band.band();
            let output = band.apply(input);

            if input >= before.0 && input <= before.1 {
                prop_assert_eq!(output, last_output);
                prop_assert_eq!(band.band(), before);
            } else {
                let (min, max) = band.band();
                prop_assert!(min <= input && input <= max);
                prop_assert_eq!(min, input.saturating_sub(delta));
                prop_assert_eq!(max, input.saturating_add(delta).min(MAX_CODE));
                prop_assert_eq!(output, min);
            }
            last_output = output;
        }
    }

    #[test]
    fn recompute_valid_iff_ordered_and_in_range(
        code0 in code(),
        code1 in code(),
        value0 in -30.0f32..=40.0,
        value1 in -30.0f32..=40.0,
    ) {
        let mut model = CalibrationModel::new(RANGE, MAX_CODE);
        model.set_point(PointId::D0, code0, value0).unwrap();
        model.set_point(PointId::D1, code1, value1).unwrap();

        let expect_valid = code1 > code0 && value1 > value0;
        match model.recompute() {
            Ok(slope) => {
                prop_assert!(expect_valid);
                prop_assert_eq!(slope, (value1 - value0) / f32::from(code1 - code0));
                prop_assert!(model.is_valid());
            }
            Err(_) => {
                prop_assert!(!expect_valid);
                prop_assert!(!model.is_valid());
            }
        }
    }

    #[test]
    fn out_of_range_values_never_enter_the_model(code0 in code(), v in value()) {
        let mut model = CalibrationModel::new(RANGE, MAX_CODE);
        let accepted = model.set_point(PointId::D0, code0, v).is_ok();
        prop_assert_eq!(accepted, RANGE.contains(v));
        prop_assert_eq!(model.point(PointId::D0).is_some(), accepted);
    }

    #[test]
    fn tick_never_publishes_without_valid_model(
        points in prop::collection::vec((any::<bool>(), code(), value()), 0..6),
        raw in code(),
    ) {
        let config = AcquisitionConfig::default();
        let mut engine = ChannelEngine::<5>::new(0, &config);
        let mut store = MemoryStore::<16>::new();
        let publisher = SnapshotPublisher::<_, 1>::new(FixedTime::new(0), Duration::from_millis(10));
        let mut adc = ScriptedAdc::steady(raw);

        for (high, code, value) in points {
            let which = if high { PointId::D1 } else { PointId::D0 };
            let _ = engine.set_point(which, code, value, &mut store);
        }

        let outcome = engine.tick(&mut adc, &publisher).unwrap();
        let published = publisher.get_value(QuantityId::Channel(0), Duration::ZERO);
        if engine.active_model().is_none() {
            prop_assert_eq!(outcome, TickOutcome::Uncalibrated);
            prop_assert_eq!(published, Err(SnapshotError::Empty));
        } else {
            prop_assert!(matches!(outcome, TickOutcome::Published(_)));
            prop_assert!(published.is_ok());
        }
    }
}

#[test]
fn end_to_end_reference_numbers() {
    let mut avg = MovingAverage::<5>::new();
    assert_eq!(avg.smooth(2048), 409);
    for _ in 0..4 {
        avg.smooth(2048);
    }
    assert_eq!(avg.smooth(2048), 2048);

    let mut model = CalibrationModel::new(RANGE, MAX_CODE);
    model.set_point(PointId::D0, 500, -10.0).unwrap();
    model.set_point(PointId::D1, 3500, 40.0).unwrap();
    assert_eq!(model.recompute(), Ok(common::STANDARD_SLOPE));
    assert!((model.apply(2000).unwrap() - 33.33).abs() < 0.01);
}
