use std::fs;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition, TableError};

use crate::error::BrainzError;

const RESPONSES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("responses");

/// Response bodies of earlier web service calls, keyed by request URL.
#[derive(Clone)]
pub struct ResponseCache {
    db: Arc<Database>,
}

impl ResponseCache {
    pub fn open(path: &Path) -> Result<Self, BrainzError> {
        let db = open_or_create_db(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, url: &str) -> Result<Option<String>, BrainzError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(RESPONSES_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let body = table.get(url)?.map(|value| value.value().to_string());
        Ok(body)
    }

    pub fn put(&self, url: &str, body: &str) -> Result<(), BrainzError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RESPONSES_TABLE)?;
            table.insert(url, body)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, BrainzError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(RESPONSES_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        Ok(table.len()? as usize)
    }

    pub fn is_empty(&self) -> Result<bool, BrainzError> {
        Ok(self.len()? == 0)
    }
}

fn open_or_create_db(path: &Path) -> Result<Database, BrainzError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if path.exists() {
        Ok(Database::open(path)?)
    } else {
        Ok(Database::create(path)?)
    }
}
