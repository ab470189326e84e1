use std::path::Path;

use sled::{Batch, Db, Tree};

use super::traits::{BatchOp, KvStore, ScanDirection, WriteBatch};
use crate::error::StoreError;

/// Opens the sled database under `path`.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Db, StoreError> {
    sled::open(path).map_err(|err| StoreError::backend(err.to_string()))
}

/// Persistent store backed by one named tree of a `sled` database.
pub struct SledStore {
    tree: Tree,
}

impl SledStore {
    pub fn open_tree(db: &Db, name: &str) -> Result<Self, StoreError> {
        let tree = db
            .open_tree(name)
            .map_err(|err| StoreError::backend(err.to_string()))?;
        Ok(Self { tree })
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.tree
            .get(key)
            .map_err(|err| StoreError::backend(err.to_string()))
            .map(|opt| opt.map(|ivec| ivec.to_vec()))
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        self.tree
            .insert(key, value)
            .map_err(|err| StoreError::backend(err.to_string()))?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.tree
            .remove(key)
            .map_err(|err| StoreError::backend(err.to_string()))?;
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut sled_batch = Batch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Delete { key } => sled_batch.remove(key),
            }
        }
        self.tree
            .apply_batch(sled_batch)
            .map_err(|err| StoreError::backend(err.to_string()))
    }

    fn scan(
        &self,
        direction: ScanDirection,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let limit = limit.unwrap_or(usize::MAX);
        let iter: Box<dyn Iterator<Item = sled::Result<(sled::IVec, sled::IVec)>>> =
            match direction {
                ScanDirection::Forward => Box::new(self.tree.iter()),
                ScanDirection::Backward => Box::new(self.tree.iter().rev()),
            };

        let mut entries = Vec::new();
        for item in iter.take(limit) {
            let (key, value) = item.map_err(|err| StoreError::backend(err.to_string()))?;
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}
