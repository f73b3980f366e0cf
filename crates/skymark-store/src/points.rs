//! Point Store.
//!
//! Persists geo-located points of interest to a local SQLite database and
//! answers the queries the overlay pipeline needs: axis-aligned bounding-box
//! search around an observer and substring search on names.
//!
//! # Storage layout
//!
//! A single table `points` is created (if it does not already exist) with
//! the following columns:
//!
//! | column      | type    | description                               |
//! |-------------|---------|-------------------------------------------|
//! | id          | INTEGER | Rowid primary key                         |
//! | name        | TEXT    | Display name                              |
//! | description | TEXT    | Free-form description                     |
//! | latitude    | REAL    | Decimal degrees, [-90, 90]                |
//! | longitude   | REAL    | Decimal degrees, [-180, 180]              |
//! | altitude    | INTEGER | Metres above sea level                    |
//!
//! The `(latitude, longitude, altitude)` triple carries a
//! `UNIQUE … ON CONFLICT REPLACE` constraint: re-inserting an existing
//! triple silently replaces the old record (last-write-wins) instead of
//! failing. That replacement is the expected dedup path, not an error.
//!
//! # Ownership & concurrency
//!
//! A [`PointStore`] is an explicitly constructed, caller-owned value — there
//! is no process-wide singleton. Clones share one connection behind a mutex,
//! which gives writers the single-writer discipline batch imports need;
//! readers take the same lock for the duration of one statement and never
//! hold it across await points.
//!
//! # Example
//!
//! ```rust
//! use skymark_store::points::PointStore;
//! use skymark_types::{LatLon, Point};
//!
//! let store = PointStore::open_in_memory().unwrap();
//!
//! let id = store
//!     .insert(&Point::new("Mont Blanc", "4810 m", 45.8326, 6.8652, 4810))
//!     .unwrap();
//! assert!(id > 0);
//!
//! let hits = store
//!     .query_around(LatLon::new(45.9, 6.9), 20_000.0)
//!     .unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, params};
use skymark_perception::geodesy::meters_to_degrees;
use skymark_types::{LatLon, Point, PointId};
use thiserror::Error;
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from point store operations.
///
/// A failed query or rejected insert leaves the store fully usable; no
/// operation here puts the database in an inconsistent state.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("coordinate out of range: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("point store lock poisoned")]
    Poisoned,
}

// ─────────────────────────────────────────────────────────────────────────────
// BatchReport
// ─────────────────────────────────────────────────────────────────────────────

/// Per-item outcome report for a batch insertion.
///
/// Items that failed (e.g. out-of-range coordinates) do not roll back the
/// items committed before them.
#[derive(Debug)]
pub struct BatchReport {
    /// One entry per input point, in input order.
    pub outcomes: Vec<Result<PointId, StoreError>>,
}

impl BatchReport {
    /// Number of points that were inserted (or replaced an existing record).
    pub fn inserted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Number of points that failed to insert.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.inserted()
    }

    /// Compatibility view of the legacy batch contract: `-1` when any item
    /// failed, otherwise the number of inserted rows. Prefer
    /// [`outcomes`][Self::outcomes], which says *which* items failed.
    pub fn sentinel(&self) -> i64 {
        if self.failed() > 0 {
            -1
        } else {
            self.inserted() as i64
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PointStore
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed point collection with dedup-insert semantics.
///
/// Cloning is cheap; all clones share the same underlying connection.
#[derive(Clone)]
pub struct PointStore {
    conn: Arc<Mutex<Connection>>,
}

impl PointStore {
    /// Open (or create) a persistent SQLite database at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a temporary in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS points (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL,
                description TEXT NOT NULL,
                latitude    REAL NOT NULL,
                longitude   REAL NOT NULL,
                altitude    INTEGER NOT NULL,
                UNIQUE(latitude, longitude, altitude) ON CONFLICT REPLACE
            );",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert a point, or replace the existing record carrying the same
    /// `(latitude, longitude, altitude)` triple.
    ///
    /// Returns the rowid of the resulting record.
    pub fn insert(&self, point: &Point) -> Result<PointId, StoreError> {
        let conn = self.conn()?;
        Self::insert_locked(&conn, point)
    }

    /// Insert each point through the same conflict policy.
    ///
    /// The connection lock is held for the whole batch, so concurrent
    /// batches never interleave partially. A failing item is reported in its
    /// slot of the returned [`BatchReport`]; items committed before it stay
    /// committed.
    pub fn insert_batch(&self, points: &[Point]) -> Result<BatchReport, StoreError> {
        let conn = self.conn()?;
        let outcomes = points
            .iter()
            .map(|point| Self::insert_locked(&conn, point))
            .collect();
        let report = BatchReport { outcomes };
        debug!(
            inserted = report.inserted(),
            failed = report.failed(),
            "batch insert finished"
        );
        Ok(report)
    }

    /// Run [`insert_batch`][Self::insert_batch] on the blocking thread pool
    /// without blocking the caller.
    ///
    /// Await the returned handle for the [`BatchReport`]. Must be called
    /// from within a Tokio runtime.
    pub fn insert_batch_async(
        &self,
        points: Vec<Point>,
    ) -> tokio::task::JoinHandle<Result<BatchReport, StoreError>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.insert_batch(&points))
    }

    fn insert_locked(conn: &Connection, point: &Point) -> Result<PointId, StoreError> {
        if !(-90.0..=90.0).contains(&point.latitude)
            || !(-180.0..=180.0).contains(&point.longitude)
        {
            return Err(StoreError::InvalidCoordinate {
                latitude: point.latitude,
                longitude: point.longitude,
            });
        }
        conn.execute(
            "INSERT INTO points (name, description, latitude, longitude, altitude)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                point.name,
                point.description,
                point.latitude,
                point.longitude,
                point.altitude,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Return all points whose coordinates fall inside the axis-aligned box
    /// of half-size `radius_m` (converted to degrees) around `center`,
    /// boundary included.
    ///
    /// The box uses the planar metre→degree approximation, so it over-reaches
    /// east–west at high latitude, and it is neither wrapped at the ±180°
    /// meridian nor clamped at the poles: callers there see incomplete
    /// results.
    pub fn query_around(&self, center: LatLon, radius_m: f64) -> Result<Vec<Point>, StoreError> {
        let delta = meters_to_degrees(radius_m);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, latitude, longitude, altitude
             FROM points
             WHERE latitude >= ?1 AND latitude <= ?2
               AND longitude >= ?3 AND longitude <= ?4
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(
            params![
                center.latitude - delta,
                center.latitude + delta,
                center.longitude - delta,
                center.longitude + delta,
            ],
            row_to_point,
        )?;
        collect_points(rows)
    }

    /// Run [`query_around`][Self::query_around] on the blocking thread pool
    /// without blocking the caller.
    ///
    /// Await the returned handle for the result. Must be called from within
    /// a Tokio runtime.
    pub fn query_around_async(
        &self,
        center: LatLon,
        radius_m: f64,
    ) -> tokio::task::JoinHandle<Result<Vec<Point>, StoreError>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.query_around(center, radius_m))
    }

    /// Return the points whose name contains `fragment`.
    ///
    /// Matching uses SQLite `LIKE`, i.e. case-insensitive for ASCII. `%` and
    /// `_` inside the fragment act as wildcards.
    pub fn find_by_name(&self, fragment: &str) -> Result<Vec<Point>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, latitude, longitude, altitude
             FROM points
             WHERE name LIKE '%' || ?1 || '%'
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![fragment], row_to_point)?;
        collect_points(rows)
    }

    /// Return every stored point, ordered by id.
    pub fn all_points(&self) -> Result<Vec<Point>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, latitude, longitude, altitude
             FROM points
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], row_to_point)?;
        collect_points(rows)
    }

    /// Number of stored points.
    pub fn len(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM points", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// True when no points are stored.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Remove every point.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.conn()?.execute("DELETE FROM points", [])?;
        Ok(())
    }
}

fn row_to_point(row: &rusqlite::Row<'_>) -> rusqlite::Result<Point> {
    Ok(Point {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        altitude: row.get(5)?,
    })
}

fn collect_points(
    rows: impl Iterator<Item = rusqlite::Result<Point>>,
) -> Result<Vec<Point>, StoreError> {
    let mut points = Vec::new();
    for row in rows {
        points.push(row?);
    }
    Ok(points)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use skymark_perception::geodesy::degrees_to_meters;

    fn make_point(name: &str, latitude: f64, longitude: f64, altitude: i64) -> Point {
        Point::new(name, format!("{name} description"), latitude, longitude, altitude)
    }

    // ── insert / dedup ──────────────────────────────────────────────────────

    #[test]
    fn insert_returns_a_positive_rowid() {
        let store = PointStore::open_in_memory().unwrap();
        let id = store.insert(&make_point("a", 45.0, 6.0, 1000)).unwrap();
        assert!(id > 0);
    }

    #[test]
    fn duplicate_triple_replaces_instead_of_growing() {
        let store = PointStore::open_in_memory().unwrap();
        store.insert(&make_point("old name", 45.0, 6.0, 1000)).unwrap();
        store.insert(&make_point("new name", 45.0, 6.0, 1000)).unwrap();

        let all = store.all_points().unwrap();
        assert_eq!(all.len(), 1, "store size must not grow on a triple conflict");
        assert_eq!(all[0].name, "new name");
    }

    #[test]
    fn same_coordinates_different_altitude_are_distinct() {
        let store = PointStore::open_in_memory().unwrap();
        store.insert(&make_point("base", 45.0, 6.0, 1000)).unwrap();
        store.insert(&make_point("summit", 45.0, 6.0, 2000)).unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn insert_rejects_out_of_range_coordinates() {
        let store = PointStore::open_in_memory().unwrap();
        let err = store.insert(&make_point("bad", 95.0, 6.0, 0)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCoordinate { .. }));

        // The store stays fully usable after a rejected insert.
        store.insert(&make_point("good", 45.0, 6.0, 0)).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    // ── batch insert ────────────────────────────────────────────────────────

    #[test]
    fn batch_reports_per_item_outcomes() {
        let store = PointStore::open_in_memory().unwrap();
        let report = store
            .insert_batch(&[
                make_point("first", 45.0, 6.0, 100),
                make_point("broken", 45.0, 200.0, 100),
                make_point("second", 45.1, 6.1, 100),
            ])
            .unwrap();

        assert_eq!(report.inserted(), 2);
        assert_eq!(report.failed(), 1);
        assert!(report.outcomes[0].is_ok());
        assert!(report.outcomes[1].is_err());
        assert!(report.outcomes[2].is_ok());
        assert_eq!(report.sentinel(), -1);

        // Items committed before the failure stay committed.
        let names: Vec<String> = store
            .all_points()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn clean_batch_sentinel_is_the_count() {
        let store = PointStore::open_in_memory().unwrap();
        let report = store
            .insert_batch(&[
                make_point("a", 45.0, 6.0, 100),
                make_point("b", 45.1, 6.1, 200),
            ])
            .unwrap();
        assert_eq!(report.sentinel(), 2);
    }

    #[tokio::test]
    async fn async_batch_completes_off_the_caller_task() {
        let store = PointStore::open_in_memory().unwrap();
        let report = store
            .insert_batch_async(vec![
                make_point("a", 45.0, 6.0, 100),
                make_point("b", 45.1, 6.1, 200),
            ])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.inserted(), 2);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_batches_serialize_without_interleaving_loss() {
        let store = PointStore::open_in_memory().unwrap();
        let first: Vec<Point> = (0..50)
            .map(|i| make_point(&format!("a{i}"), 10.0 + i as f64 * 0.01, 5.0, i))
            .collect();
        let second: Vec<Point> = (0..50)
            .map(|i| make_point(&format!("b{i}"), 20.0 + i as f64 * 0.01, 5.0, i))
            .collect();

        let handle_a = store.insert_batch_async(first);
        let handle_b = store.insert_batch_async(second);
        let report_a = handle_a.await.unwrap().unwrap();
        let report_b = handle_b.await.unwrap().unwrap();

        assert_eq!(report_a.inserted(), 50);
        assert_eq!(report_b.inserted(), 50);
        assert_eq!(store.len().unwrap(), 100);
    }

    // ── query_around ────────────────────────────────────────────────────────

    #[test]
    fn query_around_keeps_near_and_drops_far() {
        let store = PointStore::open_in_memory().unwrap();
        store.insert(&make_point("near", 48.86, 2.35, 0)).unwrap();
        // ~95 km from the observer.
        store.insert(&make_point("far", 48.0, 2.0, 0)).unwrap();

        let hits = store
            .query_around(LatLon::new(48.8566, 2.3522), 5_000.0)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "near");
    }

    #[test]
    fn query_around_is_boundary_inclusive() {
        let store = PointStore::open_in_memory().unwrap();
        store.insert(&make_point("on edge", 1.0, 0.0, 0)).unwrap();
        store.insert(&make_point("outside", 1.01, 0.0, 0)).unwrap();

        // A radius of exactly one degree puts the box edge at latitude 1.0.
        let hits = store
            .query_around(LatLon::new(0.0, 0.0), degrees_to_meters(1.0))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "on edge");
    }

    #[tokio::test]
    async fn async_query_matches_the_blocking_one() {
        let store = PointStore::open_in_memory().unwrap();
        store.insert(&make_point("near", 48.86, 2.35, 0)).unwrap();
        store.insert(&make_point("far", 48.0, 2.0, 0)).unwrap();

        let blocking = store
            .query_around(LatLon::new(48.8566, 2.3522), 5_000.0)
            .unwrap();
        let off_task = store
            .query_around_async(LatLon::new(48.8566, 2.3522), 5_000.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(blocking, off_task);
    }

    #[test]
    fn query_around_empty_store_returns_empty_vec() {
        let store = PointStore::open_in_memory().unwrap();
        assert!(store
            .query_around(LatLon::new(0.0, 0.0), 1_000.0)
            .unwrap()
            .is_empty());
    }

    // ── find_by_name ────────────────────────────────────────────────────────

    #[test]
    fn find_by_name_matches_substring_case_insensitively() {
        let store = PointStore::open_in_memory().unwrap();
        store.insert(&make_point("Mont Blanc", 45.8326, 6.8652, 4810)).unwrap();
        store.insert(&make_point("mont ventoux", 44.1741, 5.2785, 1910)).unwrap();
        store.insert(&make_point("Everest", 27.9881, 86.925, 8849)).unwrap();

        let hits = store.find_by_name("MONT").unwrap();
        let names: Vec<String> = hits.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Mont Blanc", "mont ventoux"]);
    }

    #[test]
    fn find_by_name_without_match_returns_empty_vec() {
        let store = PointStore::open_in_memory().unwrap();
        store.insert(&make_point("Mont Blanc", 45.8326, 6.8652, 4810)).unwrap();
        assert!(store.find_by_name("fuji").unwrap().is_empty());
    }

    // ── clear ───────────────────────────────────────────────────────────────

    #[test]
    fn clear_removes_everything() {
        let store = PointStore::open_in_memory().unwrap();
        store.insert(&make_point("a", 45.0, 6.0, 0)).unwrap();
        store.insert(&make_point("b", 45.1, 6.1, 0)).unwrap();

        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn clones_share_the_same_collection() {
        let store = PointStore::open_in_memory().unwrap();
        let clone = store.clone();
        clone.insert(&make_point("shared", 45.0, 6.0, 0)).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }
}
