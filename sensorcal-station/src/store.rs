//! JSON-file calibration store
//!
//! All anchors live in one small JSON object keyed `ch<N>.d<0|1>`:
//!
//! ```json
//! {
//!   "ch0.d0": { "code": 500, "value": -10.0, "generation": 3 },
//!   "ch0.d1": { "code": 3500, "value": 40.0, "generation": 3 }
//! }
//! ```
//!
//! Every `set` rewrites the whole file through a temporary sibling and a
//! rename, so a crash leaves either the old or the new file on disk. Keys are
//! still independent records: a session that wrote only one anchor restores
//! with the other missing or from another generation, and the channel stays
//! uncalibrated. Records without `generation` load as generation 0.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sensorcal_core::{CalibrationPoint, CalibrationStore, PersistenceError, StoreKey};

use crate::error::{StationError, StationResult};

/// Calibration store backed by one JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: BTreeMap<String, CalibrationPoint>,
    corrupt: bool,
}

impl JsonFileStore {
    /// Open `path`, starting empty if it does not exist yet
    ///
    /// A file that exists but cannot be parsed is not an error here: every
    /// `get` reports [`PersistenceError::Corrupt`] until the next `set`
    /// rewrites the file.
    pub fn open(path: impl Into<PathBuf>) -> StationResult<Self> {
        let path = path.into();
        let (records, corrupt) = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(records) => (records, false),
                Err(err) => {
                    log::error!("{}: unreadable calibration data: {}", path.display(), err);
                    (BTreeMap::new(), true)
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("{}: no calibration stored yet", path.display());
                (BTreeMap::new(), false)
            }
            Err(source) => return Err(StationError::Io { path, source }),
        };

        Ok(Self {
            path,
            records,
            corrupt,
        })
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored anchors
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No anchors stored
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn persist(&self) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.records)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)
    }
}

impl CalibrationStore for JsonFileStore {
    fn get(&self, key: StoreKey) -> Result<CalibrationPoint, PersistenceError> {
        if self.corrupt {
            return Err(PersistenceError::Corrupt);
        }
        self.records
            .get(&key.to_string())
            .copied()
            .ok_or(PersistenceError::NotFound)
    }

    fn set(&mut self, key: StoreKey, point: CalibrationPoint) -> Result<(), PersistenceError> {
        let name = key.to_string();
        let previous = self.records.insert(name.clone(), point);

        if let Err(err) = self.persist() {
            log::error!("{}: writing {} failed: {}", self.path.display(), name, err);
            match previous {
                Some(old) => self.records.insert(name, old),
                None => self.records.remove(&name),
            };
            return Err(PersistenceError::Write);
        }

        self.corrupt = false;
        log::debug!("{}: stored {} = {:?}", self.path.display(), name, point);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorcal_core::PointId;

    fn point(code: u16, value: f32) -> CalibrationPoint {
        CalibrationPoint::new(code, value, 1)
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("cal.json")).unwrap();
        assert!(store.is_empty());
        assert_eq!(
            store.get(StoreKey::new(0, PointId::D0)),
            Err(PersistenceError::NotFound)
        );
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.json");
        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.set(StoreKey::new(1, PointId::D0), point(500, -10.0)).unwrap();
            store.set(StoreKey::new(1, PointId::D1), point(3500, 40.0)).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(StoreKey::new(1, PointId::D1)), Ok(point(3500, 40.0)));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"ch1.d0\""));
    }

    #[test]
    fn records_without_generation_load_as_one_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.json");
        fs::write(
            &path,
            r#"{ "ch0.d0": { "code": 500, "value": -10.0 }, "ch0.d1": { "code": 3500, "value": 40.0 } }"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get(StoreKey::new(0, PointId::D0)), Ok(CalibrationPoint::new(500, -10.0, 0)));
        assert_eq!(store.get(StoreKey::new(0, PointId::D1)), Ok(CalibrationPoint::new(3500, 40.0, 0)));
    }

    #[test]
    fn corrupt_file_reports_corrupt_until_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.json");
        fs::write(&path, "{ truncated").unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        let key = StoreKey::new(0, PointId::D0);
        assert_eq!(store.get(key), Err(PersistenceError::Corrupt));

        store.set(key, point(100, 0.0)).unwrap();
        assert_eq!(store.get(key), Ok(point(100, 0.0)));
    }

    #[test]
    fn failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // Parent directory does not exist, so the temp file cannot be created
        let mut store = JsonFileStore::open(dir.path().join("missing").join("cal.json")).unwrap();
        let key = StoreKey::new(0, PointId::D1);

        assert_eq!(store.set(key, point(1, 1.0)), Err(PersistenceError::Write));
        assert_eq!(store.get(key), Err(PersistenceError::NotFound));
    }
}
