use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use geo::Intersects;

use super::index::{compute_envelope, IndexedEnvelope, RoadIndex};
use super::snapshot::{self, Fingerprint, SnapshotLock};
use super::{
    validate, NameMatch, RoadSegment, RoadStats, RoadStore, StoredRoad, UpsertOutcome,
    BOUNDS_RESULT_LIMIT, SEARCH_RESULT_LIMIT,
};
use crate::bounds::BoundingBox;
use crate::error::{QueryError, StorageError};
use crate::roads::geometry;

#[derive(Default)]
struct RoadTable {
    rows: HashMap<u64, StoredRoad>,
    index: RoadIndex,
    next_id: u64,
    /// Snapshot state this table was last synced with
    synced: Option<Fingerprint>,
}

impl RoadTable {
    fn from_rows(rows: Vec<StoredRoad>) -> Result<Self, StorageError> {
        let mut table = RoadTable {
            next_id: 1,
            ..Default::default()
        };
        let mut entries = Vec::with_capacity(rows.len());

        for road in rows {
            validate(&road.segment)?;
            let external_id = road.segment.external_id;
            if table.rows.contains_key(&external_id) {
                return Err(StorageError::Constraint(format!(
                    "duplicate way {} in snapshot",
                    external_id
                )));
            }

            table.next_id = table.next_id.max(road.id + 1);
            entries.push(IndexedEnvelope {
                external_id,
                envelope: compute_envelope(&road.segment.geometry),
            });
            table.rows.insert(external_id, road);
        }

        table.index = RoadIndex::bulk_load(entries);
        Ok(table)
    }

    /// Rows in storage (row id) order
    fn ordered(&self) -> Vec<&StoredRoad> {
        let mut rows: Vec<&StoredRoad> = self.rows.values().collect();
        rows.sort_unstable_by_key(|road| road.id);
        rows
    }

    /// Fold this table into rows read back from the snapshot.
    ///
    /// Per `external_id` the newer `updated_at` wins. A row already on disk
    /// keeps its disk row id; a row the snapshot doesn't have yet gets the
    /// next free id there.
    fn merge_into(&self, on_disk: Vec<StoredRoad>) -> Vec<StoredRoad> {
        let mut merged: HashMap<u64, StoredRoad> = on_disk
            .into_iter()
            .map(|road| (road.segment.external_id, road))
            .collect();
        let mut next_id = merged.values().map(|road| road.id).max().unwrap_or(0) + 1;

        for road in self.ordered() {
            match merged.get_mut(&road.segment.external_id) {
                Some(existing) => {
                    if road.updated_at > existing.updated_at {
                        existing.segment = road.segment.clone();
                        existing.updated_at = road.updated_at;
                    }
                }
                None => {
                    merged.insert(
                        road.segment.external_id,
                        StoredRoad {
                            id: next_id,
                            ..road.clone()
                        },
                    );
                    next_id += 1;
                }
            }
        }

        merged.into_values().collect()
    }
}

/// In-process road table with an R-Tree spatial index and optional
/// gzip-JSON snapshot on disk.
///
/// # Concurrency
/// One `RwLock` guards rows and index together, so an upsert swaps row and
/// envelope atomically. Readers see a row either before or after a write.
/// Concurrent upserts of the same id are last-write-wins.
///
/// # Persistence
/// Writes stay in memory until [`IndexedRoadStore::persist`] is called.
/// Without a snapshot path the store is memory-only.
///
/// Several processes may share one snapshot. `persist` takes the snapshot
/// lock, re-reads the file and merges before writing, so concurrent imports
/// of different ways all survive. [`IndexedRoadStore::refresh`] pulls in rows
/// other processes have persisted since.
pub struct IndexedRoadStore {
    table: RwLock<RoadTable>,
    snapshot_path: Option<PathBuf>,
}

impl IndexedRoadStore {
    pub fn in_memory() -> Self {
        IndexedRoadStore {
            table: RwLock::new(RoadTable {
                next_id: 1,
                ..Default::default()
            }),
            snapshot_path: None,
        }
    }

    /// Open a store backed by `path`, loading the snapshot if it exists
    ///
    /// # Arguments
    /// * `path` - Snapshot file; created on first `persist`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let table = {
            let _lock = SnapshotLock::acquire(&path)?;
            let mut table = RoadTable::from_rows(snapshot::load(&path)?)?;
            table.synced = snapshot::fingerprint(&path);
            table
        };

        log::info!(
            "Opened road store at {} with {} row(s)",
            path.display(),
            table.rows.len()
        );

        Ok(IndexedRoadStore {
            table: RwLock::new(table),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Merge the current table with the snapshot on disk and write the result.
    /// No-op when memory-only.
    ///
    /// Holds the snapshot lock from the re-read to the rename. Afterwards this
    /// store holds the merged table, including rows other processes wrote.
    pub fn persist(&self) -> Result<(), StorageError> {
        let path = match &self.snapshot_path {
            Some(path) => path,
            None => return Ok(()),
        };

        let mut table = self.write()?;
        let _lock = SnapshotLock::acquire(path)?;

        let mut merged = RoadTable::from_rows(table.merge_into(snapshot::load(path)?))?;
        snapshot::save(path, &merged.ordered())?;
        merged.synced = snapshot::fingerprint(path);

        log::info!("Persisted {} row(s) to {}", merged.rows.len(), path.display());
        *table = merged;
        Ok(())
    }

    /// Reload the snapshot if another process rewrote it since this store last
    /// read or wrote it. Unpersisted local rows are kept, merged the same way
    /// as in [`IndexedRoadStore::persist`].
    ///
    /// # Returns
    /// `true` when the table was reloaded
    pub fn refresh(&self) -> Result<bool, StorageError> {
        let path = match &self.snapshot_path {
            Some(path) => path,
            None => return Ok(false),
        };

        let current = snapshot::fingerprint(path);
        if current.is_none() || current == self.read()?.synced {
            return Ok(false);
        }

        let mut table = self.write()?;
        let _lock = SnapshotLock::acquire(path)?;

        let synced = snapshot::fingerprint(path);
        let mut merged = RoadTable::from_rows(table.merge_into(snapshot::load(path)?))?;
        merged.synced = synced;

        log::info!(
            "Reloaded {} from disk: {} -> {} row(s)",
            path.display(),
            table.rows.len(),
            merged.rows.len()
        );
        *table = merged;
        Ok(true)
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.read()?.rows.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RoadTable>, StorageError> {
        self.table
            .read()
            .map_err(|_| StorageError::Unavailable("road table lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RoadTable>, StorageError> {
        self.table
            .write()
            .map_err(|_| StorageError::Unavailable("road table lock poisoned".to_string()))
    }
}

impl RoadStore for IndexedRoadStore {
    fn check_connection(&self) -> Result<(), StorageError> {
        self.read()?;

        if let Some(path) = &self.snapshot_path {
            snapshot::create_parent(path)?;
            if path.exists() {
                fs::metadata(path)?;
            }
        }

        Ok(())
    }

    fn upsert(&self, segment: RoadSegment) -> Result<UpsertOutcome, StorageError> {
        validate(&segment)?;

        let external_id = segment.external_id;
        let envelope = IndexedEnvelope {
            external_id,
            envelope: compute_envelope(&segment.geometry),
        };

        let mut guard = self.write()?;
        let table = &mut *guard;
        let updated_at = Utc::now();

        let outcome = match table.rows.get_mut(&external_id) {
            Some(existing) => {
                let stale = IndexedEnvelope {
                    external_id,
                    envelope: compute_envelope(&existing.segment.geometry),
                };
                table.index.remove(&stale);

                existing.segment = segment;
                existing.updated_at = updated_at;
                UpsertOutcome::Updated
            }
            None => {
                let id = table.next_id;
                table.next_id += 1;
                table.rows.insert(
                    external_id,
                    StoredRoad {
                        id,
                        segment,
                        updated_at,
                    },
                );
                UpsertOutcome::Inserted
            }
        };

        table.index.insert(envelope);
        Ok(outcome)
    }

    fn query_by_bounds(&self, bounds: &BoundingBox) -> Result<Vec<StoredRoad>, StorageError> {
        let table = self.read()?;
        let rect = bounds.to_rect();

        let mut hits: Vec<&StoredRoad> = table
            .index
            .candidates(bounds)
            .into_iter()
            .filter_map(|external_id| table.rows.get(&external_id))
            .filter(|road| road.segment.is_accessible)
            .filter(|road| road.segment.geometry.intersects(&rect))
            .collect();

        hits.sort_unstable_by_key(|road| road.id);
        hits.truncate(BOUNDS_RESULT_LIMIT);

        log::debug!("Bounds query {} matched {} road(s)", bounds, hits.len());
        Ok(hits.into_iter().cloned().collect())
    }

    fn search_by_name(&self, query: &str) -> Result<Vec<NameMatch>, QueryError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(QueryError::InvalidQuery(
                "search query must not be empty".to_string(),
            ));
        }

        let table = self.read()?;
        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        for road in table.ordered() {
            if matches.len() >= SEARCH_RESULT_LIMIT {
                break;
            }
            if !road.segment.is_accessible {
                continue;
            }
            let name = match &road.segment.name {
                Some(name) => name,
                None => continue,
            };
            let folded = name.to_lowercase();
            if !folded.contains(&needle) || !seen.insert(folded) {
                continue;
            }

            if let Some(centroid) = geometry::centroid(&road.segment.geometry) {
                matches.push(NameMatch {
                    id: road.id,
                    name: name.clone(),
                    highway_type: road.segment.highway_type.clone(),
                    centroid,
                });
            }
        }

        Ok(matches)
    }

    fn stats(&self) -> Result<RoadStats, StorageError> {
        let table = self.read()?;

        let mut stats = RoadStats {
            total_roads: table.rows.len(),
            ..Default::default()
        };
        let mut width_sum = 0.0;
        let mut width_count = 0usize;

        for road in table.rows.values() {
            let segment = &road.segment;
            if segment.is_accessible {
                stats.accessible_roads += 1;
            }
            if let Some(width) = segment.width_m {
                width_sum += width;
                width_count += 1;
            }
            if let Some(speed) = segment.max_speed_kph {
                stats.max_speed_limit_kph =
                    Some(stats.max_speed_limit_kph.map_or(speed, |m| m.max(speed)));
            }
        }

        if width_count > 0 {
            stats.avg_width_meters = Some(width_sum / width_count as f64);
        }

        Ok(stats)
    }

    fn get(&self, external_id: u64) -> Result<Option<StoredRoad>, StorageError> {
        Ok(self.read()?.rows.get(&external_id).cloned())
    }
}
