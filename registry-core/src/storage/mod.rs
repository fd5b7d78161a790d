// KV substrate (spec §9 "Storage substrate"): a thin, column-family-keyed
// wrapper around RocksDB. Every module above this line only ever calls
// `insert`/`load_optional`/`remove`/`iter_prefix`, never touches `rocksdb`
// directly, matching the teacher's `RocksStorage` boundary.

mod column;

pub use column::Column;

use registry_common::error::StorageError;
use registry_common::serializer::Serializer;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use std::path::Path;
use std::sync::Arc;
use strum::IntoEnumIterator;

macro_rules! cf_handle {
    ($db:expr, $column:expr) => {
        $db.cf_handle($column.as_ref())
            .ok_or_else(|| StorageError::ColumnNotFound($column.to_string()))?
    };
}

pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors: Vec<ColumnFamilyDescriptor> = Column::iter()
            .map(|c| ColumnFamilyDescriptor::new(c.as_ref(), Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Storage { db: Arc::new(db) })
    }

    pub fn insert<K: AsRef<[u8]>, V: Serializer>(
        &self,
        column: Column,
        key: K,
        value: &V,
    ) -> Result<(), StorageError> {
        log::trace!("insert into {}", column);
        let cf = cf_handle!(self.db, column);
        self.db
            .put_cf(&cf, key, value.to_bytes())
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    pub fn load_optional<K: AsRef<[u8]>, V: Serializer>(
        &self,
        column: Column,
        key: K,
    ) -> Result<Option<V>, StorageError> {
        log::trace!("load from {}", column);
        let cf = cf_handle!(self.db, column);
        match self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StorageError::Io(e.to_string()))?
        {
            Some(bytes) => Ok(Some(V::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn load<K: AsRef<[u8]>, V: Serializer>(
        &self,
        column: Column,
        key: K,
    ) -> Result<V, StorageError> {
        self.load_optional(column, key)?.ok_or(StorageError::NotFound)
    }

    pub fn contains<K: AsRef<[u8]>>(&self, column: Column, key: K) -> Result<bool, StorageError> {
        let cf = cf_handle!(self.db, column);
        Ok(self
            .db
            .get_pinned_cf(&cf, key)
            .map_err(|e| StorageError::Io(e.to_string()))?
            .is_some())
    }

    pub fn remove<K: AsRef<[u8]>>(&self, column: Column, key: K) -> Result<(), StorageError> {
        log::trace!("remove from {}", column);
        let cf = cf_handle!(self.db, column);
        self.db
            .delete_cf(&cf, key)
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    /// Iterates every key with the given prefix, in lexicographic order.
    pub fn iter_prefix<V: Serializer>(
        &self,
        column: Column,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, V)>, StorageError> {
        let cf = cf_handle!(self.db, column);
        let mode = rocksdb::IteratorMode::From(prefix, rocksdb::Direction::Forward);
        let mut out = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            let (key, value) = item.map_err(|e| StorageError::Io(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_vec(), V::from_bytes(&value)?));
        }
        Ok(out)
    }

    /// Iterates every key in a column, in lexicographic order.
    pub fn iter_all<V: Serializer>(&self, column: Column) -> Result<Vec<(Vec<u8>, V)>, StorageError> {
        self.iter_prefix(column, &[])
    }
}

impl Clone for Storage {
    fn clone(&self) -> Self {
        Storage { db: self.db.clone() }
    }
}
