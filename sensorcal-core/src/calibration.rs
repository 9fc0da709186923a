//! Two-Point Linear Calibration
//!
//! ## Model
//!
//! A channel is calibrated from two anchors, each pairing a raw code with
//! the physical value measured at that code:
//!
//! ```text
//! value
//!   ▲
//!   │                 ● (code1, value1)
//!   │              ╱
//!   │           ╱
//!   │        ╱
//!   │     ● (code0, value0)
//!   └──────────────────────────► code
//!
//! slope = (value1 − value0) / (code1 − code0)
//! physical = filtered_code × slope
//! ```
//!
//! The mapping is slope-only: the derived value is `code × slope`, with no
//! intercept term.
//!
//! ## Validity
//!
//! [`CalibrationModel::recompute`] accepts a pair only when
//! `code1 > code0`, `value1 > value0` and both values lie inside the
//! device-declared [`PhysicalRange`]. A failed recompute marks the model
//! invalid but leaves the previous slope untouched, and
//! [`CalibrationModel::apply`] refuses to map codes through an invalid model.
//!
//! ## Persistence Contract
//!
//! Anchors are persisted one key per `(channel, point)` through
//! [`CalibrationStore`]. There is no multi-key transaction: if only one of a
//! pair was written, restoring finds the other missing and the model stays
//! invalid instead of mixing anchors from two calibration sessions.

use core::fmt;

use heapless::FnvIndexMap;

use crate::errors::{CalibrationError, CalibrationResult, PersistenceError};
use crate::hal::ChannelId;

/// Which of the two anchors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PointId {
    /// Low anchor
    D0,
    /// High anchor
    D1,
}

impl PointId {
    /// Both anchors, low first
    pub const ALL: [PointId; 2] = [PointId::D0, PointId::D1];

    const fn index(self) -> usize {
        match self {
            PointId::D0 => 0,
            PointId::D1 => 1,
        }
    }

    /// The partner anchor
    pub const fn other(self) -> Self {
        match self {
            PointId::D0 => PointId::D1,
            PointId::D1 => PointId::D0,
        }
    }

    /// Parse the console spelling (`d0` / `d1`, any case)
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("d0") {
            Some(PointId::D0)
        } else if name.eq_ignore_ascii_case("d1") {
            Some(PointId::D1)
        } else {
            None
        }
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::D0 => f.write_str("d0"),
            PointId::D1 => f.write_str("d1"),
        }
    }
}

/// One calibration anchor
///
/// Both anchors written in one calibration session carry the same
/// `generation`. A pair with different generations never yields a valid
/// model, so a session interrupted between its two writes cannot combine a
/// new anchor with a stale one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationPoint {
    /// Raw converter code
    pub code: u16,
    /// Physical value at that code
    pub value: f32,
    /// Calibration session the anchor was written in
    #[cfg_attr(feature = "serde", serde(default))]
    pub generation: u32,
}

impl CalibrationPoint {
    /// Anchor `(code, value)` of session `generation`
    pub const fn new(code: u16, value: f32, generation: u32) -> Self {
        Self {
            code,
            value,
            generation,
        }
    }
}

/// Device-declared physical range, inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalRange {
    /// Lowest accepted value
    pub min: f32,
    /// Highest accepted value
    pub max: f32,
}

impl PhysicalRange {
    /// Range `[min, max]`
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Inclusive membership; NaN is never contained
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Non-empty and finite
    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }

    fn check(&self, value: f32) -> CalibrationResult<()> {
        if !value.is_finite() {
            return Err(CalibrationError::NotFinite);
        }
        if !self.contains(value) {
            return Err(CalibrationError::ValueOutOfRange {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Per-channel linear map from filtered code to physical value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationModel {
    range: PhysicalRange,
    max_code: u16,
    points: [Option<CalibrationPoint>; 2],
    slope: f32,
    valid: bool,
}

impl CalibrationModel {
    /// Empty, invalid model
    pub const fn new(range: PhysicalRange, max_code: u16) -> Self {
        Self {
            range,
            max_code,
            points: [None, None],
            slope: 0.0,
            valid: false,
        }
    }

    /// Validate an anchor without storing it
    pub fn check_point(&self, code: u16, value: f32) -> CalibrationResult<()> {
        if code > self.max_code {
            return Err(CalibrationError::CodeOutOfRange {
                code,
                max: self.max_code,
            });
        }
        self.range.check(value)
    }

    /// Store one anchor as part of the current calibration session
    ///
    /// Rejects values outside the declared range (and codes above the device
    /// maximum) without mutating the model. Does not recompute.
    pub fn set_point(&mut self, which: PointId, code: u16, value: f32) -> CalibrationResult<()> {
        let point = CalibrationPoint::new(code, value, self.next_generation(which));
        self.load_point(which, point)
    }

    /// Store an anchor as given, keeping its generation (e.g. read back
    /// from a store)
    pub fn load_point(&mut self, which: PointId, point: CalibrationPoint) -> CalibrationResult<()> {
        self.check_point(point.code, point.value)?;
        self.points[which.index()] = Some(point);
        Ok(())
    }

    /// Generation a new write of `which` belongs to
    ///
    /// Writing the anchor the other one is waiting for completes that
    /// session; any other write opens a new one.
    pub fn next_generation(&self, which: PointId) -> u32 {
        let this = self.points[which.index()].map(|p| p.generation);
        let other = self.points[which.other().index()].map(|p| p.generation);
        match (this, other) {
            (None, None) => 1,
            (None, Some(open)) => open,
            (Some(this), Some(other)) if this != other => this.max(other),
            (Some(this), other) => this.max(other.unwrap_or(0)).wrapping_add(1),
        }
    }

    /// Forget one anchor
    pub fn clear_point(&mut self, which: PointId) {
        self.points[which.index()] = None;
    }

    /// Derive the slope from the current anchors
    ///
    /// On success the model becomes valid and the new slope is returned. On
    /// failure the model is marked invalid and the previous slope is kept.
    pub fn recompute(&mut self) -> CalibrationResult<f32> {
        match self.derive_slope() {
            Ok(slope) => {
                self.slope = slope;
                self.valid = true;
                Ok(slope)
            }
            Err(err) => {
                self.valid = false;
                Err(err)
            }
        }
    }

    fn derive_slope(&self) -> CalibrationResult<f32> {
        let p0 = self.points[0].ok_or(CalibrationError::MissingPoint { point: PointId::D0 })?;
        let p1 = self.points[1].ok_or(CalibrationError::MissingPoint { point: PointId::D1 })?;

        self.check_point(p0.code, p0.value)?;
        self.check_point(p1.code, p1.value)?;

        if p1.code <= p0.code {
            return Err(CalibrationError::NonIncreasingCodes {
                code0: p0.code,
                code1: p1.code,
            });
        }
        if p1.value <= p0.value {
            return Err(CalibrationError::NonIncreasingValues {
                value0: p0.value,
                value1: p1.value,
            });
        }
        if p0.generation != p1.generation {
            let stale = if p0.generation < p1.generation {
                PointId::D0
            } else {
                PointId::D1
            };
            return Err(CalibrationError::StalePoint { point: stale });
        }

        Ok((p1.value - p0.value) / f32::from(p1.code - p0.code))
    }

    /// Map a filtered code to a physical value
    ///
    /// Fails with [`CalibrationError::Invalid`] unless the last recompute
    /// succeeded.
    pub fn apply(&self, filtered_code: u16) -> CalibrationResult<f32> {
        if !self.valid {
            return Err(CalibrationError::Invalid);
        }
        Ok(f32::from(filtered_code) * self.slope)
    }

    /// Whether the last recompute succeeded
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Current slope (meaningful only when valid)
    pub fn slope(&self) -> f32 {
        self.slope
    }

    /// Anchor, if set
    pub fn point(&self, which: PointId) -> Option<CalibrationPoint> {
        self.points[which.index()]
    }

    /// Declared physical range
    pub fn range(&self) -> PhysicalRange {
        self.range
    }
}

/// Store key: one anchor of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreKey {
    /// Channel the anchor belongs to
    pub channel: ChannelId,
    /// Which anchor
    pub point: PointId,
}

impl StoreKey {
    /// Key for `(channel, point)`
    pub const fn new(channel: ChannelId, point: PointId) -> Self {
        Self { channel, point }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}.{}", self.channel, self.point)
    }
}

/// Logical key/value persistence for calibration anchors
///
/// Durability is the implementor's business; the engine only relies on
/// `get` returning what the last successful `set` wrote for that key.
pub trait CalibrationStore {
    /// Read one anchor; [`PersistenceError::NotFound`] if never written
    fn get(&self, key: StoreKey) -> Result<CalibrationPoint, PersistenceError>;

    /// Write one anchor
    fn set(&mut self, key: StoreKey, point: CalibrationPoint) -> Result<(), PersistenceError>;
}

impl<S: CalibrationStore + ?Sized> CalibrationStore for &mut S {
    fn get(&self, key: StoreKey) -> Result<CalibrationPoint, PersistenceError> {
        (**self).get(key)
    }

    fn set(&mut self, key: StoreKey, point: CalibrationPoint) -> Result<(), PersistenceError> {
        (**self).set(key, point)
    }
}

/// Fixed-capacity in-RAM store
///
/// `N` must be a power of two. Holds `N` anchors, i.e. `N / 2` channels.
/// Contents are lost on reset; use it for tests and for targets that sync
/// to flash elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore<const N: usize = 16> {
    entries: FnvIndexMap<StoreKey, CalibrationPoint, N>,
}

impl<const N: usize> MemoryStore<N> {
    /// Empty store
    pub fn new() -> Self {
        Self {
            entries: FnvIndexMap::new(),
        }
    }

    /// Number of stored anchors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No anchors stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop one anchor (simulates a lost or never-written key)
    pub fn remove(&mut self, key: StoreKey) -> Option<CalibrationPoint> {
        self.entries.remove(&key)
    }
}

impl<const N: usize> CalibrationStore for MemoryStore<N> {
    fn get(&self, key: StoreKey) -> Result<CalibrationPoint, PersistenceError> {
        self.entries.get(&key).copied().ok_or(PersistenceError::NotFound)
    }

    fn set(&mut self, key: StoreKey, point: CalibrationPoint) -> Result<(), PersistenceError> {
        self.entries
            .insert(key, point)
            .map(|_| ())
            .map_err(|_| PersistenceError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> CalibrationModel {
        CalibrationModel::new(PhysicalRange::new(-30.0, 40.0), 4095)
    }

    #[test]
    fn new_model_is_invalid() {
        let m = model();
        assert!(!m.is_valid());
        assert_eq!(m.apply(1000), Err(CalibrationError::Invalid));
    }

    #[test]
    fn recompute_derives_slope() {
        let mut m = model();
        m.set_point(PointId::D0, 500, -10.0).unwrap();
        m.set_point(PointId::D1, 3500, 40.0).unwrap();

        let slope = m.recompute().unwrap();
        assert_eq!(slope, 50.0 / 3000.0);
        assert!(m.is_valid());

        let value = m.apply(2000).unwrap();
        assert!((value - 33.333).abs() < 0.01);
    }

    #[test]
    fn set_point_rejects_out_of_range_without_mutation() {
        let mut m = model();
        m.set_point(PointId::D0, 500, -10.0).unwrap();

        let err = m.set_point(PointId::D0, 600, -31.0).unwrap_err();
        assert!(matches!(err, CalibrationError::ValueOutOfRange { .. }));
        assert_eq!(m.point(PointId::D0), Some(CalibrationPoint::new(500, -10.0, 1)));

        assert_eq!(m.set_point(PointId::D1, 100, f32::NAN), Err(CalibrationError::NotFinite));
        assert_eq!(
            m.set_point(PointId::D1, 5000, 10.0),
            Err(CalibrationError::CodeOutOfRange { code: 5000, max: 4095 })
        );
        assert_eq!(m.point(PointId::D1), None);
    }

    #[test]
    fn recompute_requires_both_points() {
        let mut m = model();
        m.set_point(PointId::D1, 3500, 40.0).unwrap();
        assert_eq!(
            m.recompute(),
            Err(CalibrationError::MissingPoint { point: PointId::D0 })
        );
    }

    #[test]
    fn failed_recompute_keeps_previous_slope() {
        let mut m = model();
        m.set_point(PointId::D0, 500, -10.0).unwrap();
        m.set_point(PointId::D1, 3500, 40.0).unwrap();
        let slope = m.recompute().unwrap();

        // Swap the codes: no longer increasing
        m.set_point(PointId::D1, 400, 40.0).unwrap();
        assert!(matches!(
            m.recompute(),
            Err(CalibrationError::NonIncreasingCodes { code0: 500, code1: 400 })
        ));
        assert!(!m.is_valid());
        assert_eq!(m.slope(), slope);
        assert_eq!(m.apply(2000), Err(CalibrationError::Invalid));
    }

    #[test]
    fn both_anchors_of_a_session_share_a_generation() {
        let mut m = model();
        m.set_point(PointId::D1, 3500, 40.0).unwrap();
        m.set_point(PointId::D0, 500, -10.0).unwrap();
        assert_eq!(m.point(PointId::D0).map(|p| p.generation), Some(1));
        assert_eq!(m.point(PointId::D1).map(|p| p.generation), Some(1));
        assert!(m.recompute().is_ok());

        // Re-writing the pending anchor stays in the open session
        m.set_point(PointId::D0, 600, -5.0).unwrap();
        m.set_point(PointId::D0, 700, -5.0).unwrap();
        assert_eq!(m.point(PointId::D0).map(|p| p.generation), Some(2));
        m.set_point(PointId::D1, 3000, 30.0).unwrap();
        assert_eq!(m.point(PointId::D1).map(|p| p.generation), Some(2));
        assert_eq!(m.recompute(), Ok(35.0 / 2300.0));
    }

    #[test]
    fn anchors_from_different_sessions_are_rejected() {
        let mut m = model();
        m.set_point(PointId::D0, 500, -10.0).unwrap();
        m.set_point(PointId::D1, 3500, 40.0).unwrap();
        assert!(m.recompute().is_ok());

        // New d0 without its d1
        m.set_point(PointId::D0, 2000, 20.0).unwrap();
        assert_eq!(
            m.recompute(),
            Err(CalibrationError::StalePoint { point: PointId::D1 })
        );
        assert!(!m.is_valid());

        // Loaded pair with mismatched generations
        let mut loaded = model();
        loaded.load_point(PointId::D0, CalibrationPoint::new(500, -10.0, 4)).unwrap();
        loaded.load_point(PointId::D1, CalibrationPoint::new(3500, 40.0, 3)).unwrap();
        assert_eq!(
            loaded.recompute(),
            Err(CalibrationError::StalePoint { point: PointId::D1 })
        );
    }

    #[test]
    fn recompute_rejects_non_increasing_values() {
        let mut m = model();
        m.set_point(PointId::D0, 500, 20.0).unwrap();
        m.set_point(PointId::D1, 3500, 20.0).unwrap();
        assert!(matches!(
            m.recompute(),
            Err(CalibrationError::NonIncreasingValues { .. })
        ));
    }

    #[test]
    fn point_id_parses_console_spelling() {
        assert_eq!(PointId::parse("d0"), Some(PointId::D0));
        assert_eq!(PointId::parse("D1"), Some(PointId::D1));
        assert_eq!(PointId::parse("d2"), None);
    }

    #[test]
    fn memory_store_round_trip_and_not_found() {
        let mut store = MemoryStore::<4>::new();
        let key = StoreKey::new(1, PointId::D1);
        assert_eq!(store.get(key), Err(PersistenceError::NotFound));

        let point = CalibrationPoint::new(3000, 25.0, 1);
        store.set(key, point).unwrap();
        assert_eq!(store.get(key), Ok(point));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_store_reports_full() {
        let mut store = MemoryStore::<2>::new();
        let point = CalibrationPoint::new(1, 1.0, 1);
        store.set(StoreKey::new(0, PointId::D0), point).unwrap();
        store.set(StoreKey::new(0, PointId::D1), point).unwrap();
        assert_eq!(
            store.set(StoreKey::new(1, PointId::D0), point),
            Err(PersistenceError::Write)
        );
    }

    #[test]
    fn store_key_display() {
        let key = StoreKey::new(2, PointId::D0);
        assert_eq!(format!("{}", key), "ch2.d0");
    }
}
