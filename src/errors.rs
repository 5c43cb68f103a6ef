// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Content API returned {status} for {url}")]
    Status { status: reqwest::StatusCode, url: String },

    #[error("Content API response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid content API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Content API request failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("Malformed entry '{entry_id}': missing required field '{field}'")]
    MalformedEntry { entry_id: String, field: &'static str },

    #[error("Malformed entry '{entry_id}': field '{field}' {reason}")]
    InvalidField { entry_id: String, field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error("No {0} loaded yet")]
    EmptyCollectionAccess(&'static str),

    #[error("Concurrent {collection} load failed: {reason}")]
    SharedLoadFailed { collection: &'static str, reason: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue { name: &'static str, value: String, reason: String },
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error("RSS write error: {0}")]
    Rss(#[from] rss::Error),

    #[error("Feed is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize routes: {0}")]
    Serialize(#[from] serde_json::Error),
}
