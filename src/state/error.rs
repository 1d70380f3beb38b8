use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to initialize catalog store: {0}")]
    Catalog(#[source] anyhow::Error),
}
