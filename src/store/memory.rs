use std::collections::BTreeMap;
use std::sync::Mutex;

use super::traits::{BatchOp, KvStore, ScanDirection, WriteBatch};
use crate::error::StoreError;

/// Ephemeral store over a `BTreeMap`; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_map<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<Vec<u8>, Vec<u8>>) -> T,
    ) -> Result<T, StoreError> {
        let mut map = self.map.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut map))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_map(|map| map.get(key).cloned())
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        self.with_map(|map| {
            map.insert(key, value);
        })
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.with_map(|map| {
            map.remove(key);
        })
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        // Single lock for the whole batch keeps it atomic for readers.
        self.with_map(|map| {
            for op in batch.into_ops() {
                match op {
                    BatchOp::Delete { key } => {
                        map.remove(&key);
                    }
                }
            }
        })
    }

    fn scan(
        &self,
        direction: ScanDirection,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let limit = limit.unwrap_or(usize::MAX);
        self.with_map(|map| {
            let clone = |(k, v): (&Vec<u8>, &Vec<u8>)| (k.clone(), v.clone());
            match direction {
                ScanDirection::Forward => map.iter().take(limit).map(clone).collect(),
                ScanDirection::Backward => map.iter().rev().take(limit).map(clone).collect(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for k in ["b", "a", "c"] {
            store.put(k.as_bytes().to_vec(), k.as_bytes().to_vec()).unwrap();
        }
        store
    }

    #[test]
    fn get_distinguishes_missing_keys() {
        let store = seeded();
        assert_eq!(store.get(b"a").unwrap(), Some(b"a".to_vec()));
        assert_eq!(store.get(b"zz").unwrap(), None);
    }

    #[test]
    fn scan_respects_direction_and_limit() {
        let store = seeded();
        let fwd: Vec<_> = store
            .scan(ScanDirection::Forward, None)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(fwd, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

        let back: Vec<_> = store
            .scan(ScanDirection::Backward, Some(2))
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(back, vec![b"c".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn batch_applies_every_op() {
        let store = seeded();
        let mut batch = WriteBatch::new();
        batch.delete(b"a".to_vec());
        batch.delete(b"b".to_vec());
        batch.delete(b"missing".to_vec());
        assert_eq!(batch.len(), 3);
        store.write_batch(batch).unwrap();

        let keys: Vec<_> = store
            .scan(ScanDirection::Forward, None)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"c".to_vec()]);
    }
}
