//! An in-memory implementation of [`LogStore`], primarily for testing.

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::ops::RangeFrom;
use std::sync::Mutex;

use crate::message::LogEntry;

use super::{after_last_checkpoint, LogStore};

/// A [`LogStore`] keeping every partition's resolved records in memory.
///
/// Offers no durability; it exists for tests and for clusters whose log is
/// disposable.
pub struct MemoryLogStore {
    partitions: Mutex<HashMap<u32, BTreeMap<u64, LogEntry>>>,
}

impl MemoryLogStore {
    /// Constructs an empty store.
    pub fn new() -> Self {
        MemoryLogStore {
            partitions: Mutex::new(HashMap::new()),
        }
    }

    fn write(&self, partition: u32, log: &LogEntry) {
        let mut partitions = self.lock();
        partitions
            .entry(partition)
            .or_insert_with(BTreeMap::new)
            .insert(log.id, log.clone());
    }

    fn read(&self, partition: u32, range: RangeFrom<u64>) -> Vec<LogEntry> {
        let partitions = self.lock();
        match partitions.get(&partition) {
            Some(entries) => entries.range(range).map(|(_, log)| log.clone()).collect(),
            None => Vec::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u32, BTreeMap<u64, LogEntry>>> {
        self.partitions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        MemoryLogStore::new()
    }
}

impl LogStore for MemoryLogStore {
    type Error = Infallible;

    fn propose(&self, partition: u32, log: &LogEntry) -> Result<(), Self::Error> {
        self.write(partition, log);
        Ok(())
    }

    fn commit(&self, partition: u32, log: &LogEntry) -> Result<(), Self::Error> {
        self.write(partition, log);
        Ok(())
    }

    fn read_logs(&self, partition: u32) -> Result<Vec<LogEntry>, Self::Error> {
        let entries = self.read(partition, 0..);
        Ok(after_last_checkpoint(&entries).cloned().collect())
    }

    fn read_logs_range(&self, partition: u32, start_id: u64) -> Result<Vec<LogEntry>, Self::Error> {
        Ok(self.read(partition, start_id..))
    }

    fn get_max_log(&self, partition: u32) -> Result<u64, Self::Error> {
        let partitions = self.lock();
        Ok(partitions
            .get(&partition)
            .and_then(|entries| entries.keys().next_back().copied())
            .unwrap_or(0))
    }

    fn get_current_term(&self, partition: u32) -> Result<u64, Self::Error> {
        let partitions = self.lock();
        Ok(partitions
            .get(&partition)
            .and_then(|entries| entries.values().map(|log| log.term).max())
            .unwrap_or(0))
    }

    fn exists(&self, partition: u32, id: u64) -> Result<bool, Self::Error> {
        let partitions = self.lock();
        Ok(partitions
            .get(&partition)
            .map(|entries| entries.contains_key(&id))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod test {
    use crate::log_store_tests;

    use super::*;

    log_store_tests!(MemoryLogStore, MemoryLogStore::new());
}
