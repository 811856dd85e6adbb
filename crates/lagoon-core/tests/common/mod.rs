use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use ndarray::Array2;

use lagoon_core::error::{CompositeError, Result};
use lagoon_core::io::catalog::ImageCatalog;
use lagoon_core::io::sink::CompositeSink;
use lagoon_core::scene::{CandidateImage, CompositeImage, Scene, SceneMeta};
use lagoon_core::tide::model::{ConstituentGrid, GridSpec, TideModel};
use lagoon_core::tile::{BoundingBox, DateRange, GeoPoint, Tile};

pub fn ts(text: &str) -> DateTime<Utc> {
    text.parse().expect("valid RFC3339 timestamp")
}

/// A tile off the north-west Australian coast, matching the default
/// test tide model coverage.
pub fn test_tile(id: &str) -> Tile {
    Tile {
        id: id.to_string(),
        footprint: BoundingBox {
            west: 115.0,
            south: -21.0,
            east: 116.0,
            north: -20.0,
        },
        water_centroid: GeoPoint {
            lat: -20.5,
            lon: 115.5,
        },
    }
}

/// Scene with the given bands all filled with one value.
pub fn uniform_scene(bands: &[&str], rows: usize, cols: usize, value: f32) -> Scene {
    Scene::from_bands(
        bands
            .iter()
            .map(|&band| (band, Array2::from_elem((rows, cols), value))),
    )
    .expect("bands share dimensions")
}

pub fn meta(id: &str, tile_id: &str, timestamp: &str, cloud: f32) -> SceneMeta {
    SceneMeta {
        id: id.to_string(),
        tile_id: tile_id.to_string(),
        timestamp: ts(timestamp),
        cloud_cover_percent: cloud,
        orbit_number: None,
    }
}

pub fn candidate(id: &str, cloud: f32, scene: Scene) -> CandidateImage {
    CandidateImage {
        meta: meta(id, "T1", "2021-06-01T00:00:00Z", cloud),
        scene,
    }
}

/// In-memory catalog fixture. Captures are served per tile id; load
/// failures and transient query failures can be injected.
#[derive(Default)]
pub struct MemoryCatalog {
    pub entries: Vec<(SceneMeta, Scene)>,
    pub corrupt: Vec<String>,
    pub query_failures: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new(entries: Vec<(SceneMeta, Scene)>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn with_corrupt(mut self, id: &str) -> Self {
        self.corrupt.push(id.to_string());
        self
    }

    pub fn with_query_failures(self, count: usize) -> Self {
        self.query_failures.store(count, Ordering::SeqCst);
        self
    }
}

impl ImageCatalog for MemoryCatalog {
    fn query(&self, tile: &Tile, _range: &DateRange) -> Result<Vec<SceneMeta>> {
        if self
            .query_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CompositeError::TransientIo("catalog offline".to_string()));
        }
        Ok(self
            .entries
            .iter()
            .filter(|(meta, _)| meta.tile_id == tile.id)
            .map(|(meta, _)| meta.clone())
            .collect())
    }

    fn load(&self, meta: &SceneMeta) -> Result<Scene> {
        if self.corrupt.contains(&meta.id) {
            return Err(CompositeError::CorruptImage(meta.id.clone()));
        }
        self.entries
            .iter()
            .find(|(entry, _)| entry.id == meta.id)
            .map(|(_, scene)| scene.clone())
            .ok_or_else(|| CompositeError::TransientIo(format!("missing capture {}", meta.id)))
    }
}

/// In-memory sink fixture recording (key, image_count) pairs. Stores
/// can fail transiently a fixed number of times, or persistently for
/// keys containing a marker.
#[derive(Default)]
pub struct MemorySink {
    pub stored: Mutex<Vec<(String, usize)>>,
    pub store_failures: AtomicUsize,
    pub fail_keys: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store_failures(self, count: usize) -> Self {
        self.store_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn failing_keys(mut self, marker: &str) -> Self {
        self.fail_keys.push(marker.to_string());
        self
    }

    pub fn keys(&self) -> Vec<String> {
        self.stored
            .lock()
            .expect("sink lock")
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl CompositeSink for MemorySink {
    fn store(&self, key: &str, image: &CompositeImage) -> Result<()> {
        if self.fail_keys.iter().any(|marker| key.contains(marker)) {
            return Err(CompositeError::TransientIo("storage offline".to_string()));
        }
        if self
            .store_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CompositeError::TransientIo("storage offline".to_string()));
        }
        self.stored
            .lock()
            .expect("sink lock")
            .push((key.to_string(), image.image_count));
        Ok(())
    }
}

/// Tide model with one constituent whose constants are uniform over a
/// 4x4 degree grid covering the test tile.
pub fn uniform_tide_model(name: &str, speed_deg_per_hour: f64, amplitude: f64, phase_deg: f64) -> TideModel {
    let grid = GridSpec {
        lat0: -22.0,
        lon0: 114.0,
        dlat: 1.0,
        dlon: 1.0,
        nlat: 4,
        nlon: 4,
    };
    let nodes = grid.nlat * grid.nlon;
    TideModel {
        grid,
        constituents: vec![ConstituentGrid {
            name: name.to_string(),
            speed_deg_per_hour,
            amplitude: vec![amplitude; nodes],
            phase_deg: vec![phase_deg; nodes],
        }],
    }
}
