use thiserror::Error;

/// Result type used throughout the query layer
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the spatial query layer
#[derive(Error, Debug)]
pub enum Error {
    /// Latitude or longitude out of range or not finite
    #[error("Invalid coordinate (lat: {lat}, lon: {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// Degenerate region or a failure of the covering computation
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The document store could not be reached or failed while executing a
    /// request. The original error is kept as the source.
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Error::InvalidGeometry(reason.into())
    }

    /// Wrap an error reported by a document store
    pub fn store(err: anyhow::Error) -> Self {
        Error::StoreUnavailable(err.into())
    }

    /// `true` for errors caused by malformed input. Retrying such a request
    /// can never succeed.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCoordinate { .. } | Error::InvalidGeometry(_)
        )
    }
}
