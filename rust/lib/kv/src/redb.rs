use std::path::Path;

use redb::{Database, ReadableTable, Table, TableDefinition};

use crate::error::KVError;
use crate::traits::KVStore;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

fn storage<E: std::fmt::Display>(e: E) -> KVError {
    KVError::Storage(e.to_string())
}

/// KVStore backed by redb, a pure-Rust embedded database.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, KVError> {
        let db = Database::create(path).map_err(storage)?;
        let store = Self { db };
        // Create the table up front so reads never hit TableDoesNotExist.
        store.write(|_| Ok(()))?;
        tracing::debug!(path = %path.display(), "opened redb store");
        Ok(store)
    }

    /// Run `f` inside a single write transaction and commit it.
    fn write<F>(&self, f: F) -> Result<(), KVError>
    where
        F: FnOnce(&mut Table<'_, &'static str, &'static [u8]>) -> Result<(), KVError>,
    {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(TABLE).map_err(storage)?;
            f(&mut table)?;
        }
        txn.commit().map_err(storage)
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(TABLE).map_err(storage)?;
        let value = table.get(key).map_err(storage)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        self.write(|table| {
            table.insert(key, value).map_err(storage)?;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        self.write(|table| {
            table.remove(key).map_err(storage)?;
            Ok(())
        })
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(TABLE).map_err(storage)?;

        let mut results = Vec::new();
        for entry in table.range(prefix..).map_err(storage)? {
            let (k, v) = entry.map_err(storage)?;
            let key = k.value();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_string(), v.value().to_vec()));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.redb");
        {
            let kv = RedbStore::open(&path).unwrap();
            kv.set("ads/session-1", b"2030-01-01T00:00:00+00:00").unwrap();
        }
        let kv = RedbStore::open(&path).unwrap();
        assert!(kv.get("ads/session-1").unwrap().is_some());
        assert!(kv.get("ads/session-2").unwrap().is_none());
    }

    #[test]
    fn scan_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let kv = RedbStore::open(&dir.path().join("kv.redb")).unwrap();
        kv.set("ads/a", b"1").unwrap();
        kv.set("ads/b", b"2").unwrap();
        kv.set("b/other", b"3").unwrap();
        assert_eq!(kv.scan("ads/").unwrap().len(), 2);

        kv.delete("ads/a").unwrap();
        let left = kv.scan("ads/").unwrap();
        assert_eq!(left, vec![("ads/b".to_string(), b"2".to_vec())]);
    }
}
