use thiserror::Error;

#[derive(Error, Debug)]
pub enum VitalsError {
    #[error("Unsupported recording format: {0}")]
    SourceFormat(String),

    #[error("Filter design failed: {0}")]
    FilterDesign(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VitalsError>;
