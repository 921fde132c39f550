//! RocksDB storage backend for the issuer node.

use anyhow::Result;
use rocksdb::{ColumnFamilyDescriptor, Options, WriteOptions, DB};
use std::path::Path;

use vcanchor_credentials::{CounterStore, SequenceError};

/// Column family names.
const CF_STATE: &str = "state";
const CF_META: &str = "meta";

/// Key of the sequence counter in [`CF_STATE`].
const SEQUENCE_KEY: &[u8] = b"sequence_counter";
/// Key of the issuer DID in [`CF_META`].
const ISSUER_DID_KEY: &[u8] = b"issuer_did";

/// RocksDB-backed storage for the issuer node.
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create a RocksDB database at the given path with column families.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_STATE, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    /// Put a value into a column family with a synced write.
    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", cf_name))?;
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.db.put_cf_opt(&cf, key, value, &write_opts)?;
        Ok(())
    }

    /// Get a value from a column family.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", cf_name))?;
        let value = self.db.get_cf(&cf, key)?;
        Ok(value)
    }

    /// Issuer DID recorded by a previous run.
    pub fn get_issuer_did(&self) -> Result<Option<String>> {
        match self.get(CF_META, ISSUER_DID_KEY)? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_issuer_did(&self, did: &str) -> Result<()> {
        self.put(CF_META, ISSUER_DID_KEY, did.as_bytes())
    }
}

/// Sequence counter persisted as 8 big-endian bytes in the state column family.
impl CounterStore for Storage {
    fn load(&self) -> Result<Option<u64>, SequenceError> {
        let raw = self
            .get(CF_STATE, SEQUENCE_KEY)
            .map_err(|e| SequenceError::Read(e.to_string()))?;
        match raw {
            None => Ok(None),
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    SequenceError::Corrupt(format!("expected 8 bytes, found {}", bytes.len()))
                })?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
        }
    }

    fn store(&self, value: u64) -> Result<(), SequenceError> {
        self.put(CF_STATE, SEQUENCE_KEY, &value.to_be_bytes())
            .map_err(|e| SequenceError::Write(e.to_string()))
    }
}
