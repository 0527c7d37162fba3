use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required credential: {0}")]
    MissingCredential(&'static str),

    // Market data errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected payload from {provider}: {reason}")]
    UnexpectedPayload { provider: String, reason: String },

    #[error("Provider {0} returned no data")]
    EmptyResult(String),

    #[error("All market data providers failed")]
    AllProvidersFailed,

    // Delivery errors
    #[error("Telegram API error: {0}")]
    Telegram(String),
}
