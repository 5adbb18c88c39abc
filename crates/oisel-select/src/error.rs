use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("selector YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid range for {field}: [{min}, {max}]")]
    InvalidRange { field: String, min: f64, max: f64 },

    #[error("invalid selector: {0}")]
    Invalid(String),
}
