use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::VersionLog;
use crate::error::{MigrationError, MigrationResult};
use crate::migrations::{Version, VersionLogEntry};

/// In-process version log, for tests and embedded use
#[derive(Debug, Default)]
pub struct MemoryVersionLog {
    entries: RwLock<BTreeMap<Version, VersionLogEntry>>,
}

impl MemoryVersionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set of entries
    pub fn with_entries(entries: impl IntoIterator<Item = VersionLogEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.version, entry))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Look up a single entry
    pub async fn get(&self, version: Version) -> Option<VersionLogEntry> {
        self.entries.read().await.get(&version).cloned()
    }

    /// Applied versions, ascending
    pub async fn versions(&self) -> Vec<Version> {
        self.entries.read().await.keys().copied().collect()
    }
}

#[async_trait]
impl VersionLog for MemoryVersionLog {
    async fn list(&self) -> MigrationResult<Vec<VersionLogEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn insert(&self, entry: VersionLogEntry) -> MigrationResult<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.version) {
            return Err(MigrationError::ledger(format!(
                "version {} is already recorded",
                entry.version
            )));
        }
        entries.insert(entry.version, entry);
        Ok(())
    }

    async fn update(&self, entry: VersionLogEntry) -> MigrationResult<()> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&entry.version) {
            Some(existing) => {
                *existing = entry;
                Ok(())
            }
            None => Err(MigrationError::ledger(format!(
                "version {} is not recorded",
                entry.version
            ))),
        }
    }

    async fn delete(&self, version: Version) -> MigrationResult<()> {
        self.entries
            .write()
            .await
            .remove(&version)
            .map(|_| ())
            .ok_or_else(|| MigrationError::ledger(format!("version {} is not recorded", version)))
    }

    async fn update_breakpoint(&self, version: Version, breakpoint: bool) -> MigrationResult<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&version)
            .ok_or_else(|| MigrationError::ledger(format!("version {} is not recorded", version)))?;
        entry.breakpoint = breakpoint;
        Ok(())
    }

    async fn reset_breakpoints(&self) -> MigrationResult<u64> {
        let mut cleared = 0;
        for entry in self.entries.write().await.values_mut() {
            if entry.breakpoint {
                entry.breakpoint = false;
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(version: Version) -> VersionLogEntry {
        let now = Utc::now();
        VersionLogEntry::new(version, format!("M{}", version), now, now)
    }

    #[tokio::test]
    async fn test_insert_and_list_sorted() {
        let log = MemoryVersionLog::new();
        log.insert(entry(3)).await.unwrap();
        log.insert(entry(1)).await.unwrap();

        let versions: Vec<_> = log.list().await.unwrap().iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 3]);
        assert!(log.insert(entry(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_version_fails() {
        let log = MemoryVersionLog::with_entries(vec![entry(1)]);
        assert!(log.delete(2).await.is_err());
        log.delete(1).await.unwrap();
        assert!(log.versions().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_breakpoints_counts_changes() {
        let log = MemoryVersionLog::with_entries(vec![
            entry(1).with_breakpoint(true),
            entry(2),
            entry(3).with_breakpoint(true),
        ]);

        assert_eq!(log.reset_breakpoints().await.unwrap(), 2);
        assert_eq!(log.reset_breakpoints().await.unwrap(), 0);
        assert!(!log.get(3).await.unwrap().breakpoint);
    }
}
