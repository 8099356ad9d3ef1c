//! In-memory cache, for tests and ephemeral runs

use chrono::Utc;
use std::sync::RwLock;

use super::{CachedMatrix, FeatureCache};
use crate::error::{ClusterError, Result};
use crate::model::FeatureMatrix;

#[derive(Default)]
pub struct MemoryFeatureCache {
    entry: RwLock<Option<CachedMatrix>>,
}

impl MemoryFeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing entry (e.g. a stale one)
    pub fn with_entry(entry: CachedMatrix) -> Self {
        Self {
            entry: RwLock::new(Some(entry)),
        }
    }

    pub fn is_empty(&self) -> bool {
        !matches!(self.read(), Ok(Some(_)))
    }
}

impl FeatureCache for MemoryFeatureCache {
    fn read(&self) -> Result<Option<CachedMatrix>> {
        let entry = self
            .entry
            .read()
            .map_err(|_| ClusterError::Cache("memory cache lock poisoned".into()))?;
        Ok(entry.clone())
    }

    fn write(&self, matrix: &FeatureMatrix) -> Result<()> {
        let mut entry = self
            .entry
            .write()
            .map_err(|_| ClusterError::Cache("memory cache lock poisoned".into()))?;
        *entry = Some(CachedMatrix::new(matrix.clone(), Utc::now()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_write_then_read() {
        let cache = MemoryFeatureCache::new();
        assert!(cache.is_empty());
        assert!(cache.read().unwrap().is_none());

        let matrix = FeatureMatrix::new(
            vec!["ETH".into(), "BTC".into()],
            vec![NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()],
            vec![vec![0.02], vec![-0.01]],
        )
        .unwrap();
        cache.write(&matrix).unwrap();

        let hit = cache.read().unwrap().unwrap();
        assert_eq!(hit.matrix, matrix);
        assert!(!cache.is_empty());
    }
}
