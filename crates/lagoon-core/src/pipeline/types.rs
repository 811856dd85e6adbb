use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Processing stage a tile is in, used for reporting and error
/// attribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileStage {
    Pending,
    Filtering,
    Scoring,
    Compositing,
}

impl std::fmt::Display for TileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Filtering => write!(f, "filtering candidates"),
            Self::Scoring => write!(f, "scoring and curating"),
            Self::Compositing => write!(f, "compositing"),
        }
    }
}

/// Terminal outcome for one tile. A failed tile never aborts its
/// siblings.
#[derive(Clone, Debug)]
pub enum TileOutcome {
    Done { images_used: usize },
    Skipped { reason: String },
    Failed { stage: TileStage, error: String },
}

/// Per-tile outcome report, the minimum user-visible result of a run.
#[derive(Clone, Debug)]
pub struct TileReport {
    pub tile_id: String,
    pub outcome: TileOutcome,
    pub elapsed: Duration,
}

impl TileReport {
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, TileOutcome::Done { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, TileOutcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, TileOutcome::Failed { .. })
    }
}

/// Cooperative run-level cancellation. Cancelling stops new tiles from
/// being dispatched; tiles already in flight finish or fail cleanly.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
