//! SQLite storage backend.
//!
//! Every precondition on the target file (directory writable, existing
//! file really is a SQLite database) is checked before a connection is
//! opened, so a bad path never clobbers an unrelated file.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use rusqlite::{Connection, OpenFlags, Transaction};

use crate::error::StorageError;
use crate::tables::{self, Record};

/// First 16 bytes of every SQLite 3 database file
pub const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// True if `path` is a regular file starting with the SQLite header
pub fn is_valid_store(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let mut header = [0u8; 16];
    match File::open(path).and_then(|mut file| file.read_exact(&mut header)) {
        Ok(()) => &header == SQLITE_HEADER,
        Err(_) => false,
    }
}

/// Check that a snapshot can be written to `path` without touching it
fn check_writable(path: &Path) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.is_dir() {
        return Err(StorageError::NotWritable(dir));
    }
    // Probe the directory; the file is removed when dropped.
    tempfile::tempfile_in(&dir).map_err(|_| StorageError::NotWritable(dir.clone()))?;

    if path.exists() {
        let meta = fs::metadata(path).map_err(|e| StorageError::io(path, e))?;
        if !meta.is_file() || meta.permissions().readonly() {
            return Err(StorageError::NotWritable(path.to_path_buf()));
        }
        if meta.len() > 0 && !is_valid_store(path) {
            return Err(StorageError::InvalidSignature(path.to_path_buf()));
        }
    }
    Ok(())
}

/// A connection to one dojo database
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) `path` as a save target
    pub fn create(path: &Path) -> Result<Self, StorageError> {
        check_writable(path)?;
        debug!("Opening {} for writing", path.display());
        Self::configure(Connection::open(path)?)
    }

    /// Open an existing database read-only, after checking its signature
    pub fn open_existing(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            return Err(StorageError::io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "database file not found"),
            ));
        }
        if !is_valid_store(path) {
            return Err(StorageError::InvalidSignature(path.to_path_buf()));
        }
        debug!("Opening {} for reading", path.display());
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::configure(conn)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Create the tables if they do not exist yet
    pub fn create_schema(&self) -> Result<(), StorageError> {
        tables::create_schema(&self.conn)?;
        Ok(())
    }

    /// Run `f` inside one transaction: commit on `Ok`, roll back on `Err`
    pub fn run_in_transaction<T, F>(&mut self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
    {
        let tx = self.conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    /// Every row of one table
    pub fn query_all<R: Record>(&self) -> Result<Vec<R>, StorageError> {
        Ok(tables::query_all(&self.conn)?)
    }
}
