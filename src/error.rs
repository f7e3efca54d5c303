use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraderError {
    /// Malformed or undersized curve account payload.
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Pricing or RPC read failure.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Building, signing or sending a trade transaction failed.
    #[error("Submission error: {0}")]
    SubmissionError(String),

    #[error("Wallet error: {0}")]
    WalletError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Position error: {0}")]
    PositionError(String),
}
