use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::error::{CompositeError, Result};
use crate::filters::ndwi::with_ndwi_band;
use crate::filters::sunglint::correct_collection;
use crate::io::catalog::{filter_candidates, ImageCatalog};
use crate::io::sink::CompositeSink;
use crate::pipeline::config::{CompositeConfig, Product};
use crate::pipeline::types::{CancelToken, TileOutcome, TileReport, TileStage};
use crate::quality::glint::screen_high_glint;
use crate::quality::noise::curate_by_noise;
use crate::scene::{CandidateImage, CuratedCollection};
use crate::stack::percentile::percentile_composite;
use crate::tide::model::TideModel;
use crate::tide::select::select_by_tide;
use crate::tile::Tile;

/// Drives the per-tile pipeline over a worker pool.
///
/// Holds the immutable run configuration, the external catalog and sink
/// collaborators, and the shared read-only tide model. Each tile is
/// processed end-to-end by one worker; tiles never share state.
pub struct Orchestrator {
    config: CompositeConfig,
    catalog: Arc<dyn ImageCatalog>,
    sink: Arc<dyn CompositeSink>,
    tide_model: Option<Arc<TideModel>>,
}

impl Orchestrator {
    /// Validates the configuration up front; an invalid configuration
    /// aborts the run before any tile is dispatched.
    pub fn new(
        config: CompositeConfig,
        catalog: Arc<dyn ImageCatalog>,
        sink: Arc<dyn CompositeSink>,
        tide_model: Option<Arc<TideModel>>,
    ) -> Result<Self> {
        config.validate(tide_model.is_some())?;
        if let Some(model) = &tide_model {
            model.validate()?;
        }
        Ok(Self {
            config,
            catalog,
            sink,
            tide_model,
        })
    }

    /// Process every tile, returning one report per tile in input
    /// order. Per-tile failures never abort sibling tiles.
    pub fn run(&self, tiles: &[Tile]) -> Result<Vec<TileReport>> {
        self.run_cancellable(tiles, &CancelToken::new())
    }

    /// Like `run`, but stops dispatching new tiles once the token is
    /// cancelled. In-flight tiles finish or fail cleanly; undispatched
    /// tiles are reported as skipped.
    pub fn run_cancellable(&self, tiles: &[Tile], cancel: &CancelToken) -> Result<Vec<TileReport>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.thread_count)
            .build()
            .map_err(|err| CompositeError::InvalidConfig(format!("worker pool: {err}")))?;

        info!(
            tiles = tiles.len(),
            threads = self.config.thread_count,
            product = self.config.product.name(),
            "starting composite run"
        );
        let reports: Vec<TileReport> = pool.install(|| {
            tiles
                .par_iter()
                .map(|tile| {
                    if cancel.is_cancelled() {
                        return TileReport {
                            tile_id: tile.id.clone(),
                            outcome: TileOutcome::Skipped {
                                reason: "run cancelled before dispatch".to_string(),
                            },
                            elapsed: Duration::ZERO,
                        };
                    }
                    self.process_tile(tile)
                })
                .collect()
        });

        let done = reports.iter().filter(|report| report.is_done()).count();
        let skipped = reports.iter().filter(|report| report.is_skipped()).count();
        let failed = reports.iter().filter(|report| report.is_failed()).count();
        info!(done, skipped, failed, "composite run finished");
        Ok(reports)
    }

    fn process_tile(&self, tile: &Tile) -> TileReport {
        let started = Instant::now();
        info!(tile = %tile.id, "processing tile");
        let outcome = match self.run_tile(tile) {
            Ok(outcome) => outcome,
            Err((stage, err @ CompositeError::InsufficientCandidates { .. })) => {
                info!(tile = %tile.id, stage = %stage, "skipping tile: {err}");
                TileOutcome::Skipped {
                    reason: err.to_string(),
                }
            }
            Err((stage, err)) => {
                error!(tile = %tile.id, stage = %stage, error = %err, "tile failed");
                TileOutcome::Failed {
                    stage,
                    error: err.to_string(),
                }
            }
        };
        TileReport {
            tile_id: tile.id.clone(),
            outcome,
            elapsed: started.elapsed(),
        }
    }

    fn run_tile(&self, tile: &Tile) -> std::result::Result<TileOutcome, (TileStage, CompositeError)> {
        let candidates = self
            .collect_candidates(tile)
            .map_err(|err| (TileStage::Filtering, err))?;
        if candidates.is_empty() {
            return Ok(TileOutcome::Skipped {
                reason: "no candidate images passed filtering".to_string(),
            });
        }

        let collection = self
            .curate(tile, candidates)
            .map_err(|err| (TileStage::Scoring, err))?;

        let images_used = self
            .compose_and_store(tile, &collection)
            .map_err(|err| (TileStage::Compositing, err))?;
        Ok(TileOutcome::Done { images_used })
    }

    /// Filtering stage: query the catalog and decode the ordered
    /// candidate list, retrying the whole pass on transient failures.
    fn collect_candidates(&self, tile: &Tile) -> Result<Vec<CandidateImage>> {
        let range = self.config.date_range();
        let options = self.config.filter_options();
        with_retry(
            self.config.retry_attempts,
            Duration::from_millis(self.config.retry_backoff_ms),
            "catalog filtering",
            || {
                filter_candidates(self.catalog.as_ref(), tile, &range, &options)?
                    .collect::<Result<Vec<_>>>()
            },
        )
    }

    /// Scoring stage: screen, then curate by the product's ranking key.
    fn curate(&self, tile: &Tile, mut candidates: Vec<CandidateImage>) -> Result<CuratedCollection> {
        if let Some(params) = &self.config.glint_screen {
            candidates = screen_high_glint(candidates, params)?;
        }
        match self.config.product.tide_window() {
            Some(window) => {
                let model = self.tide_model.as_deref().ok_or_else(|| {
                    CompositeError::InvalidConfig("tide model missing".to_string())
                })?;
                select_by_tide(
                    model,
                    tile,
                    candidates,
                    window,
                    self.config.min_images_in_base,
                    self.config.max_images_in_composite,
                )
            }
            None => curate_by_noise(
                candidates,
                self.config.min_images_in_base,
                self.config.max_images_in_composite,
            ),
        }
    }

    /// Compositing stage: correct, derive, reduce and persist. The
    /// composite is fully formed before the sink sees it; a failed
    /// store leaves nothing behind.
    fn compose_and_store(&self, tile: &Tile, collection: &CuratedCollection) -> Result<usize> {
        let corrected = if self.config.correct_sun_glint {
            correct_collection(collection, &self.config.glint)?
        } else {
            collection.clone()
        };
        let prepared = match self.config.product {
            Product::Ndwi { .. } => corrected.map_scenes(with_ndwi_band)?,
            _ => corrected,
        };

        let composite = percentile_composite(
            &prepared,
            self.config.percentile,
            &tile.id,
            &self.config.version_tag,
        )?;
        let key = self.storage_key(&tile.id);
        with_retry(
            self.config.retry_attempts,
            Duration::from_millis(self.config.retry_backoff_ms),
            "composite store",
            || self.sink.store(&key, &composite),
        )?;
        info!(tile = %tile.id, key = %key, images = composite.image_count, "composite stored");
        Ok(composite.image_count)
    }

    fn storage_key(&self, tile_id: &str) -> String {
        let mut key = format!(
            "comp_p{}_{}_{}",
            self.config.percentile,
            self.config.product.name(),
            tile_id
        );
        if !self.config.version_tag.is_empty() {
            key.push('_');
            key.push_str(&self.config.version_tag);
        }
        key
    }
}

/// Run `op`, retrying transient failures up to `attempts` times with a
/// linearly growing delay. Non-transient errors surface immediately.
fn with_retry<T>(
    attempts: usize,
    backoff: Duration,
    what: &str,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut last_error = None;
    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < attempts => {
                warn!(attempt, attempts, error = %err, "{what} failed, retrying");
                std::thread::sleep(backoff * attempt as u32);
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_error
        .unwrap_or_else(|| CompositeError::TransientIo(format!("{what} exhausted retries"))))
}
