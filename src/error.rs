//! Typed errors for the IPF and IES codecs. Library code returns these;
//! only the CLI binary wraps them in `anyhow::Context`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpfError {
    #[error("invalid IPF archive: {0}")]
    InvalidFormat(String),

    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("decrypted stream is not valid DEFLATE for entry: {0}")]
    EncryptionMismatch(String),

    #[error("archive reader has been closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum IesError {
    #[error("invalid IES file: {0}")]
    InvalidFormat(String),

    #[error("column not found: {0}")]
    FieldNotFound(String),

    #[error("column {column} is not a {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
