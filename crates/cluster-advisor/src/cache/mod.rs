//! Feature Cache
//!
//! Persists the aligned return matrix so restarts within the TTL skip the
//! slow, rate-limited history download.

mod file;
mod memory;

pub use file::FileFeatureCache;
pub use memory::MemoryFeatureCache;

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::model::FeatureMatrix;

/// A stored matrix and when it was written
#[derive(Clone, Debug, PartialEq)]
pub struct CachedMatrix {
    pub matrix: FeatureMatrix,
    pub written_at: DateTime<Utc>,
}

impl CachedMatrix {
    pub const fn new(matrix: FeatureMatrix, written_at: DateTime<Utc>) -> Self {
        Self { matrix, written_at }
    }

    /// Younger than `ttl` at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.written_at < ttl
    }
}

/// Storage for the feature matrix
///
/// `read` returns `Ok(None)` when nothing has been stored yet. Callers treat
/// any error as a miss.
pub trait FeatureCache: Send + Sync {
    fn read(&self) -> Result<Option<CachedMatrix>>;

    /// Replace the stored matrix wholesale
    fn write(&self, matrix: &FeatureMatrix) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cached(written_at: DateTime<Utc>) -> CachedMatrix {
        let matrix = FeatureMatrix::new(
            vec!["BTC".into()],
            vec![NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()],
            vec![vec![0.01]],
        )
        .unwrap();
        CachedMatrix::new(matrix, written_at)
    }

    #[test]
    fn test_freshness_window() {
        let now = Utc::now();
        let ttl = Duration::seconds(86_400);

        assert!(cached(now - Duration::seconds(3_600)).is_fresh(now, ttl));
        assert!(!cached(now - Duration::seconds(90_000)).is_fresh(now, ttl));
        // exactly ttl old is stale
        assert!(!cached(now - ttl).is_fresh(now, ttl));
    }
}
