use super::{IndexError, IndexStore};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-process index store.
///
/// Used for local runs without a Redis instance and by the test suite. Every
/// call is counted, including failed ones, and the store can be switched to
/// an unavailable mode where every call fails with a connection error.
/// Empty sets are removed like Redis does.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    data: Mutex<MemoryData>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

#[derive(Debug, Default)]
struct MemoryData {
    values: HashMap<String, Vec<u8>>,
    sets: HashMap<String, BTreeSet<String>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations issued against the store so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Inspect a plain value without counting a call.
    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().values.get(key).cloned()
    }

    /// Inspect a set without counting a call.
    pub fn set_members(&self, key: &str) -> BTreeSet<String> {
        self.lock().sets.get(key).cloned().unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let data = self.lock();
        data.values.contains_key(key) || data.sets.contains_key(key)
    }

    /// All keys currently present, sorted.
    pub fn keys(&self) -> Vec<String> {
        let data = self.lock();
        let mut keys: Vec<String> = data.values.keys().chain(data.sets.keys()).cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> MutexGuard<'_, MemoryData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<MutexGuard<'_, MemoryData>, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IndexError::Connection(
                "memory index store marked unavailable".to_string(),
            ));
        }
        Ok(self.lock())
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        let mut data = self.begin()?;
        data.sets.remove(key);
        data.values.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let data = self.begin()?;
        Ok(data.values.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), IndexError> {
        let mut data = self.begin()?;
        data.values.remove(key);
        data.sets.remove(key);
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), IndexError> {
        let mut data = self.begin()?;
        if data.values.contains_key(key) {
            return Err(IndexError::Command {
                op: "SADD",
                key: key.to_owned(),
                message: "WRONGTYPE key holds a plain value".to_string(),
            });
        }
        data.sets
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned());
        Ok(())
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> Result<(), IndexError> {
        let mut data = self.begin()?;
        if let Some(set) = data.sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                data.sets.remove(key);
            }
        }
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, IndexError> {
        let data = self.begin()?;
        Ok(data
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), IndexError> {
        let _data = self.begin()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_set_disappears() {
        let store = MemoryIndexStore::new();
        store.add_to_set("s", "a").await.unwrap();
        assert!(store.contains_key("s"));
        store.remove_from_set("s", "a").await.unwrap();
        assert!(!store.contains_key("s"));
        // removing again is a no-op
        store.remove_from_set("s", "a").await.unwrap();
        assert_eq!(store.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_store_counts_and_fails() {
        let store = MemoryIndexStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.set("k", b"v").await,
            Err(IndexError::Connection(_))
        ));
        assert_eq!(store.call_count(), 1);
        assert!(!store.contains_key("k"));
    }
}
