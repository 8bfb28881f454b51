//! Error types for planning operations.

/// Result type for planning operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Error type for planning operations
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Invalid observing window: {0}")]
    InvalidWindow(String),

    #[error("Invalid planning parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Catalogue error: {0}")]
    CatalogueError(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}

/// Failure reported by a position oracle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Position of {name} unavailable at MJD {mjd}")]
    PositionUnavailable { name: String, mjd: f64 },

    #[error("Ephemeris service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Failure reported by a segment sequencer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SequencerError {
    #[error("Seed {seed} is below the minimum elevation at MJD {mjd}")]
    SeedNotVisible { seed: String, mjd: f64 },

    #[error("Sequencer unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle failure while sequencing: {0}")]
    Oracle(#[from] OracleError),
}
