use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ScopeKeyError {
    /// The scope could not be turned into a statement the store accepts.
    #[error("failed to build scope query: {0}")]
    QueryConstruction(String),

    /// Connection, timeout or permission failure reported by the store.
    #[error("store failed to execute scope query: {0}")]
    StoreExecution(#[source] BoxError),

    /// The store has no `md5` or `array_agg` available.
    #[error("store does not support scope key aggregation: {0}")]
    AggregationUnsupported(String),
}

impl ScopeKeyError {
    pub fn store<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        ScopeKeyError::StoreExecution(err.into())
    }
}

pub type ScopeKeyResult<T> = std::result::Result<T, ScopeKeyError>;
