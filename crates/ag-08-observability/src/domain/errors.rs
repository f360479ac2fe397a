use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("metrics registry error: {0}")]
    Registry(String),
}

impl From<prometheus::Error> for ObservabilityError {
    fn from(err: prometheus::Error) -> Self {
        Self::Registry(err.to_string())
    }
}
