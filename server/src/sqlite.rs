use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use kernel::FileRecord;
use rusqlite::blob::ZeroBlob;
use rusqlite::{params, Connection, DatabaseName, Error, OpenFlags, OptionalExtension};

use crate::domain::{MetadataStore, ObjectStore, StoreError, StoredObject};
use crate::signing::UrlSigner;

const CACHE_SIZE: &str = "4096";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub enum Mode {
    ReadWrite,
    ReadOnly,
}

/// Single connection to the database file. Opened per operation.
pub struct Sqlite {
    conn: Connection,
}

impl From<Error> for StoreError {
    fn from(e: Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl Sqlite {
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<Self, Error> {
        let c = match mode {
            Mode::ReadWrite => Connection::open(path),
            Mode::ReadOnly => Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY),
        }?;
        c.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn: c })
    }

    /// Creates bucket and metadata tables unless they already exist.
    pub fn new_database(&self, bucket: &str, table: &str) -> Result<(), StoreError> {
        let bucket = quote(bucket)?;
        let table = quote(table)?;
        self.pragma_update("encoding", "UTF-8")?;

        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {bucket} (
                  key          TEXT PRIMARY KEY,
                  content_type TEXT NOT NULL,
                  data         BLOB NOT NULL
                  )"
            ),
            [],
        )?;

        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                  id           TEXT PRIMARY KEY,
                  file_name    TEXT NOT NULL,
                  file_key     TEXT NOT NULL,
                  upload_date  TEXT NOT NULL
                  )"
            ),
            [],
        )?;

        Ok(())
    }

    fn assign_cache_size(&self) -> Result<(), Error> {
        self.pragma_update("cache_size", CACHE_SIZE)
    }

    fn pragma_update(&self, name: &str, value: &str) -> Result<(), Error> {
        self.conn.pragma_update(None, name, value)
    }
}

/// Object store kept in a table named after the bucket.
pub struct ObjectBucket {
    db: PathBuf,
    name: String,
    signer: UrlSigner,
}

impl ObjectBucket {
    #[must_use]
    pub fn new(db: PathBuf, name: &str, signer: UrlSigner) -> Self {
        Self {
            db,
            name: name.to_owned(),
            signer,
        }
    }
}

impl ObjectStore for ObjectBucket {
    fn put_object(&self, key: &str, content_type: &str, data: &[u8]) -> Result<(), StoreError> {
        let bucket = quote(&self.name)?;
        let len = i32::try_from(data.len())
            .map_err(|_| StoreError::Backend(format!("object {key} is too large")))?;

        let mut sqlite = Sqlite::open(&self.db, Mode::ReadWrite)?;
        sqlite.assign_cache_size()?;
        sqlite.pragma_update("synchronous", "FULL")?;

        let tx = sqlite.conn.transaction()?;
        tx.execute(
            &format!("INSERT INTO {bucket} (key, content_type, data) VALUES (?1, ?2, ?3)"),
            params![key, content_type, &ZeroBlob(len)],
        )?;
        let rowid = tx.last_insert_rowid();

        {
            let mut blob = tx.blob_open(DatabaseName::Main, &self.name, "data", rowid, false)?;
            blob.write_all(data)
                .map_err(|e| StoreError::Backend(format!("object {key} not written: {e}")))?;
            blob.close()?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_object(&self, key: &str) -> Result<StoredObject, StoreError> {
        let bucket = quote(&self.name)?;
        let sqlite = Sqlite::open(&self.db, Mode::ReadOnly)?;
        let object = sqlite
            .conn
            .query_row(
                &format!("SELECT content_type, data FROM {bucket} WHERE key = ?1"),
                params![key],
                |row| {
                    Ok(StoredObject {
                        content_type: row.get(0)?,
                        data: row.get(1)?,
                    })
                },
            )
            .optional()?;
        object.ok_or_else(|| StoreError::NotFound(key.to_owned()))
    }

    fn presign_read(&self, key: &str, expires_in: Duration) -> Result<String, StoreError> {
        Ok(self.signer.sign(key, expires_in))
    }
}

/// Metadata store kept in a table of its own.
pub struct MetadataTable {
    db: PathBuf,
    name: String,
}

impl MetadataTable {
    #[must_use]
    pub fn new(db: PathBuf, name: &str) -> Self {
        Self {
            db,
            name: name.to_owned(),
        }
    }
}

impl MetadataStore for MetadataTable {
    fn put_record(&self, record: &FileRecord) -> Result<(), StoreError> {
        let table = quote(&self.name)?;
        let sqlite = Sqlite::open(&self.db, Mode::ReadWrite)?;
        sqlite.pragma_update("synchronous", "FULL")?;
        sqlite.conn.execute(
            &format!(
                "INSERT INTO {table} (id, file_name, file_key, upload_date)
                 VALUES (?1, ?2, ?3, ?4)"
            ),
            params![
                &record.id,
                &record.file_name,
                &record.file_key,
                &record.upload_date
            ],
        )?;
        Ok(())
    }

    fn scan(&self) -> Result<Vec<FileRecord>, StoreError> {
        let table = quote(&self.name)?;
        let sqlite = Sqlite::open(&self.db, Mode::ReadOnly)?;
        let mut stmt = sqlite.conn.prepare(&format!(
            "SELECT id, file_name, file_key, upload_date FROM {table}"
        ))?;
        let rows = stmt.query_map([], |row| {
            let upload_date: DateTime<Utc> = row.get(3)?;
            Ok(FileRecord {
                id: row.get(0)?,
                file_name: row.get(1)?,
                file_key: row.get(2)?,
                upload_date,
            })
        })?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

/// Quotes a table name so that it can be spliced into a statement.
fn quote(name: &str) -> Result<String, StoreError> {
    if name.is_empty() || name.contains('\0') {
        return Err(StoreError::InvalidName(name.to_owned()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}
