//! Error Types for Cluster Advisor

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Error, Debug)]
pub enum ClusterError {
    /// Not enough aligned dates or assets to build a feature matrix
    #[error("Insufficient data: {0}")]
    DataInsufficient(String),

    /// Engine configuration cannot be satisfied by the data
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ticker is not part of the current cluster assignment
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Holding quantity is negative or unparseable
    #[error("Invalid holding: {0}")]
    InvalidHolding(String),

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ClusterError {
    /// Whether the session survives this error (only the current query fails)
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AssetNotFound(_) | Self::InvalidHolding(_) | Self::MarketData(_) | Self::Network(_)
        )
    }

    /// Convert to a user-facing explanation
    pub fn user_message(&self) -> String {
        match self {
            Self::DataInsufficient(msg) => {
                format!("Not enough market data to build clusters: {msg}")
            }
            Self::Configuration(msg) => format!("The clustering setup is invalid: {msg}"),
            Self::AssetNotFound(ticker) => {
                format!("Coin '{ticker}' is not in the analyzed universe.")
            }
            Self::InvalidHolding(msg) => format!("Could not read holding: {msg}"),
            Self::MarketData(_) | Self::Network(_) => {
                "The market data service is unavailable. Please try again.".into()
            }
            _ => "An unexpected error occurred.".into(),
        }
    }
}
