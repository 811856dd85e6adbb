use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("point ({lat}, {lon}) is outside tide model coverage")]
    OutOfCoverage { lat: f64, lon: f64 },

    #[error("only {found} candidate images passed filtering (minimum {minimum})")]
    InsufficientCandidates { found: usize, minimum: usize },

    #[error("transient I/O failure: {0}")]
    TransientIo(String),

    #[error("corrupt image: {0}")]
    CorruptImage(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing band: {0}")]
    MissingBand(String),

    #[error("band {band} is {actual_rows}x{actual_cols}, expected {expected_rows}x{expected_cols}")]
    DimensionMismatch {
        band: String,
        expected_rows: usize,
        expected_cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    #[error("empty image collection")]
    EmptyCollection,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tide model parse error: {0}")]
    ModelParse(#[from] toml::de::Error),
}

impl CompositeError {
    /// Whether the failure is worth retrying at the orchestrator level.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientIo(_))
    }
}

pub type Result<T> = std::result::Result<T, CompositeError>;
