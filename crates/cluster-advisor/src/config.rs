//! Engine Configuration
//!
//! Cluster count, seed, restarts, anchor tickers and session settings are
//! passed explicitly so a run is reproducible and the theme taxonomy can be
//! swapped without touching the engine.

use serde::{Deserialize, Serialize};

use crate::model::normalize_ticker;

/// Default analyzed universe (top coins by market cap)
pub const DEFAULT_UNIVERSE: &[&str] = &[
    "BTC", "ETH", "USDT", "BNB", "SOL", "USDC", "XRP", "DOGE", "TON", "ADA", "SHIB", "AVAX",
    "TRX", "DOT", "BCH", "LINK", "NEAR", "MATIC", "LTC", "ICP", "LEO", "DAI", "UNI", "APT",
    "ETC", "MANTLE", "RNDR", "HBAR", "FIL", "ATOM", "ARB", "IMX", "STX", "CRO", "VET", "MKR",
    "INJ", "OP", "GRT", "KAS", "XLM", "XMR", "PEPE", "FDUSD", "SUI", "OKB", "LDO", "QNT",
    "THETA", "SEI",
];

/// Which cluster wins when several clusters map to the same theme
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Highest matching cluster id wins (later matches overwrite earlier ones)
    #[default]
    LastMatch,
    /// Lowest matching cluster id wins
    FirstMatch,
}

impl TieBreak {
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "first" | "first_match" => Self::FirstMatch,
            _ => Self::LastMatch,
        }
    }
}

/// Anchor tickers whose membership names a cluster's theme
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeAnchors {
    pub safe_haven: Vec<String>,
    pub blue_chips: Vec<String>,
    pub high_volatility: Vec<String>,
}

impl Default for ThemeAnchors {
    fn default() -> Self {
        Self {
            safe_haven: vec!["USDC".into(), "USDT".into()],
            blue_chips: vec!["ETH".into(), "SOL".into()],
            high_volatility: vec!["PEPE".into(), "DOGE".into()],
        }
    }
}

impl ThemeAnchors {
    /// Uppercase every anchor
    pub fn normalized(mut self) -> Self {
        for list in [&mut self.safe_haven, &mut self.blue_chips, &mut self.high_volatility] {
            for ticker in list.iter_mut() {
                *ticker = normalize_ticker(ticker);
            }
        }
        self
    }
}

/// Clustering and advice parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of clusters `k`
    pub clusters: usize,

    /// Seed for centroid initialization
    pub seed: u64,

    /// Independent initializations; the lowest-inertia run is kept
    pub restarts: usize,

    /// Iteration cap per run
    pub max_iterations: usize,

    /// Stop when total squared centroid movement falls to or below this
    pub tolerance: f64,

    /// Anchor tickers per theme
    pub anchors: ThemeAnchors,

    /// Theme -> cluster resolution policy
    pub tie_break: TieBreak,

    /// Example tickers listed per suggestion
    pub max_examples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clusters: 4,
            seed: 42,
            restarts: 10,
            max_iterations: 300,
            tolerance: 1e-10,
            anchors: ThemeAnchors::default(),
            tie_break: TieBreak::LastMatch,
            max_examples: 5,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `CLUSTER_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            clusters: env_parse("CLUSTER_COUNT").unwrap_or(defaults.clusters),
            seed: env_parse("CLUSTER_SEED").unwrap_or(defaults.seed),
            restarts: env_parse("CLUSTER_RESTARTS").unwrap_or(defaults.restarts),
            max_iterations: env_parse("CLUSTER_MAX_ITERATIONS").unwrap_or(defaults.max_iterations),
            tie_break: std::env::var("CLUSTER_TIE_BREAK")
                .map(|s| TieBreak::from_str_lossy(&s))
                .unwrap_or(defaults.tie_break),
            ..defaults
        }
    }

    pub fn with_clusters(mut self, clusters: usize) -> Self {
        self.clusters = clusters;
        self
    }

    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub const fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    pub const fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_anchors(mut self, anchors: ThemeAnchors) -> Self {
        self.anchors = anchors.normalized();
        self
    }
}

/// Settings for one analysis session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    pub engine: EngineConfig,

    /// Tickers fetched on a cache miss
    pub universe: Vec<String>,

    /// History window requested from the provider (days)
    pub lookback_days: u32,

    /// Maximum cache age before a refetch (seconds)
    pub cache_ttl_secs: i64,

    /// Where the file cache lives
    pub cache_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            universe: DEFAULT_UNIVERSE.iter().map(|t| (*t).to_string()).collect(),
            lookback_days: 90,
            cache_ttl_secs: 86_400,
            cache_path: "data/features.json".into(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let universe = std::env::var("UNIVERSE")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(normalize_ticker)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|u| !u.is_empty())
            .unwrap_or(defaults.universe);

        Self {
            engine: EngineConfig::from_env(),
            universe,
            lookback_days: env_parse("LOOKBACK_DAYS").unwrap_or(defaults.lookback_days),
            cache_ttl_secs: env_parse("CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl_secs),
            cache_path: std::env::var("CACHE_PATH").unwrap_or(defaults.cache_path),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_config() {
        let config = EngineConfig::default();
        assert_eq!(config.clusters, 4);
        assert_eq!(config.restarts, 10);
        assert_eq!(config.tie_break, TieBreak::LastMatch);
        assert_eq!(config.anchors.safe_haven, vec!["USDC", "USDT"]);
    }

    #[test]
    fn test_anchor_normalization() {
        let anchors = ThemeAnchors {
            safe_haven: vec!["dai".into()],
            blue_chips: vec![" btc".into()],
            high_volatility: vec!["Shib".into()],
        };
        let config = EngineConfig::default().with_anchors(anchors);
        assert_eq!(config.anchors.safe_haven, vec!["DAI"]);
        assert_eq!(config.anchors.blue_chips, vec!["BTC"]);
        assert_eq!(config.anchors.high_volatility, vec!["SHIB"]);
    }

    #[test]
    fn test_tie_break_parsing() {
        assert_eq!(TieBreak::from_str_lossy("first"), TieBreak::FirstMatch);
        assert_eq!(TieBreak::from_str_lossy("FIRST_MATCH"), TieBreak::FirstMatch);
        assert_eq!(TieBreak::from_str_lossy("anything"), TieBreak::LastMatch);
    }

    #[test]
    fn test_default_universe_contains_anchors() {
        let session = SessionConfig::default();
        for anchor in ["USDC", "USDT", "ETH", "SOL", "PEPE", "DOGE"] {
            assert!(session.universe.iter().any(|t| t == anchor));
        }
        assert_eq!(session.cache_ttl_secs, 86_400);
    }
}
