use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::{RoadSegment, StoredRoad};
use crate::error::StorageError;
use crate::roads::geometry::{self, LineStringGeometry};

const SNAPSHOT_VERSION: u32 = 1;

/// Modification time and length of a snapshot file, used to notice rewrites
pub type Fingerprint = (SystemTime, u64);

/// On-disk form of one row (geo types don't derive Serialize)
#[derive(Clone, Debug, Serialize, Deserialize)]
struct SnapshotRow {
    id: u64,
    osm_id: u64,
    name: Option<String>,
    highway_type: String,
    width: Option<f64>,
    max_speed: Option<u32>,
    is_accessible: bool,
    geometry: LineStringGeometry,
    updated_at: DateTime<Utc>,
}

impl From<&StoredRoad> for SnapshotRow {
    fn from(road: &StoredRoad) -> Self {
        let segment = &road.segment;
        SnapshotRow {
            id: road.id,
            osm_id: segment.external_id,
            name: segment.name.clone(),
            highway_type: segment.highway_type.clone(),
            width: segment.width_m,
            max_speed: segment.max_speed_kph,
            is_accessible: segment.is_accessible,
            geometry: geometry::encode(&segment.geometry),
            updated_at: road.updated_at,
        }
    }
}

impl TryFrom<SnapshotRow> for StoredRoad {
    type Error = StorageError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let line = row.geometry.decode().map_err(|e| {
            StorageError::Constraint(format!("row {} has bad geometry: {}", row.osm_id, e))
        })?;

        Ok(StoredRoad {
            id: row.id,
            segment: RoadSegment {
                external_id: row.osm_id,
                name: row.name,
                highway_type: row.highway_type,
                width_m: row.width,
                max_speed_kph: row.max_speed,
                is_accessible: row.is_accessible,
                geometry: line,
            },
            updated_at: row.updated_at,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    rows: Vec<SnapshotRow>,
}

/// Write all rows as gzip-compressed JSON.
///
/// Goes through a sibling temp file and a rename so a crash mid-write leaves
/// the previous snapshot intact.
pub fn save(path: &Path, rows: &[&StoredRoad]) -> Result<(), StorageError> {
    create_parent(path)?;

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        rows: rows.iter().map(|road| SnapshotRow::from(*road)).collect(),
    };

    let tmp_path = temp_path(path);
    let file = File::create(&tmp_path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, &snapshot)?;
    encoder.finish()?.flush()?;

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read rows back. A missing file is an empty table, not an error.
pub fn load(path: &Path) -> Result<Vec<StoredRoad>, StorageError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let snapshot: Snapshot = serde_json::from_reader(decoder)?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StorageError::Unavailable(format!(
            "unsupported snapshot version {} in {}",
            snapshot.version,
            path.display()
        )));
    }

    snapshot.rows.into_iter().map(StoredRoad::try_from).collect()
}

/// Current fingerprint, or `None` when the file does not exist
pub fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let metadata = fs::metadata(path).ok()?;
    Some((metadata.modified().ok()?, metadata.len()))
}

/// Exclusive advisory lock on a snapshot, held until dropped.
///
/// The lock lives on a `.lock` sibling so it survives the rename that
/// replaces the snapshot itself. Every process that reads-then-writes the
/// snapshot takes it for the whole read-merge-write cycle.
pub struct SnapshotLock {
    file: File,
}

impl SnapshotLock {
    /// Block until the lock for `path` is free
    ///
    /// # Arguments
    /// * `path` - Snapshot file (the lock file sits next to it)
    ///
    /// # Returns
    /// Guard that releases the lock on drop
    pub fn acquire(path: &Path) -> Result<Self, StorageError> {
        create_parent(path)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(sibling(path, ".lock"))?;
        file.lock_exclusive()?;

        Ok(SnapshotLock { file })
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::warn!("Failed to release snapshot lock: {}", e);
        }
    }
}

pub fn create_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    sibling(path, ".tmp")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString};
    use std::env;

    fn road(id: u64, external_id: u64, name: Option<&str>) -> StoredRoad {
        StoredRoad {
            id,
            segment: RoadSegment {
                external_id,
                name: name.map(str::to_string),
                highway_type: "residential".to_string(),
                width_m: Some(3.5),
                max_speed_kph: None,
                is_accessible: true,
                geometry: LineString::new(vec![
                    Coord { x: 12.4964, y: 41.9028 },
                    Coord { x: 12.4970, y: 41.9031 },
                    Coord { x: 12.4951, y: 41.9040 },
                ]),
            },
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = env::temp_dir().join("urbanway_snapshot_roundtrip");
        let path = dir.join("roads.json.gz");

        let rows = vec![road(1, 100, Some("Via Roma")), road(2, 200, None)];
        save(&path, &rows.iter().collect::<Vec<_>>()).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, rows);
        assert!(!temp_path(&path).exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_snapshot_is_empty() {
        let path = env::temp_dir().join("urbanway_snapshot_missing/none.json.gz");
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_error() {
        let dir = env::temp_dir().join("urbanway_snapshot_corrupt");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roads.json.gz");
        fs::write(&path, b"not gzip at all").unwrap();

        assert!(load(&path).is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let path = Path::new("/data/roads.json.gz");
        assert_eq!(temp_path(path), PathBuf::from("/data/roads.json.gz.tmp"));
        assert_eq!(sibling(path, ".lock"), PathBuf::from("/data/roads.json.gz.lock"));
    }

    #[test]
    fn test_fingerprint_tracks_file() {
        let dir = env::temp_dir().join("urbanway_snapshot_fingerprint");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("roads.json.gz");

        assert!(fingerprint(&path).is_none());

        let rows = vec![road(1, 100, None)];
        save(&path, &rows.iter().collect::<Vec<_>>()).unwrap();
        let first = fingerprint(&path).unwrap();
        assert!(first.1 > 0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_lock_is_released_on_drop() {
        let dir = env::temp_dir().join("urbanway_snapshot_lock");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("roads.json.gz");

        let lock = SnapshotLock::acquire(&path).unwrap();
        assert!(sibling(&path, ".lock").exists());
        drop(lock);

        // Would block forever if the first guard still held it
        let again = SnapshotLock::acquire(&path).unwrap();
        drop(again);

        fs::remove_dir_all(&dir).unwrap();
    }
}
