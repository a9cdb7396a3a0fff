use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StampError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("corrupted metadata block: {0}")]
    Corrupted(String),
    #[error("metadata block not allowed: {0}")]
    Forbidden(String),
    #[error("schema validation failed: {0}")]
    SchemaInvalid(String),
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
}
