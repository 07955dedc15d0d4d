use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuarryError {
    /// Missing or invalid connection settings; the connection is constructed
    /// dead and every operation on it returns its failure default.
    #[error("configuration error: {0}")]
    Config(String),
    /// Connection establishment or query execution failed.
    #[error("database error: {0}")]
    Database(#[from] mysql::Error),
    /// A result row did not have the expected shape.
    #[error("malformed result: {0}")]
    Decode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QuarryError>;
