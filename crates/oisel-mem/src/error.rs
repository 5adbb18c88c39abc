use thiserror::Error;

/// Result type local to oisel-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("range pool configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] oisel_core::error::Error),
}
