use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

const DB_FILE: &str = "pdfview.db";
const CURRENT_DIR: &str = "./";
const DEFAULT_PORT: u16 = 5000;

pub const BUCKET_VAR: &str = "PDFVIEW_BUCKET";
pub const TABLE_VAR: &str = "PDFVIEW_TABLE";
pub const DATA_DIR_VAR: &str = "PDFVIEW_DATA_DIR";
pub const DATA_FILE_VAR: &str = "PDFVIEW_DATA_FILE";
pub const PORT_VAR: &str = "PDFVIEW_PORT";
pub const PUBLIC_URL_VAR: &str = "PDFVIEW_PUBLIC_URL";
pub const SIGNING_SECRET_VAR: &str = "PDFVIEW_SIGNING_SECRET";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),

    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Object store bucket name
    pub bucket: String,
    /// Metadata table name
    pub table: String,
    pub db: PathBuf,
    pub port: u16,
    /// Externally visible base URL, used for signed links and by the browser page
    pub public_url: String,
    pub signing_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket = lookup(BUCKET_VAR).ok_or(ConfigError::Missing(BUCKET_VAR))?;
        let table = lookup(TABLE_VAR).ok_or(ConfigError::Missing(TABLE_VAR))?;

        let dir = lookup(DATA_DIR_VAR).unwrap_or_else(|| String::from(CURRENT_DIR));
        let db_file = lookup(DATA_FILE_VAR).unwrap_or_else(|| String::from(DB_FILE));

        let port = match lookup(PORT_VAR) {
            Some(p) => p.parse().map_err(|_| ConfigError::InvalidPort(p))?,
            None => DEFAULT_PORT,
        };

        let public_url =
            lookup(PUBLIC_URL_VAR).unwrap_or_else(|| format!("http://localhost:{port}"));

        // Links signed by a random secret do not survive a restart. They live five minutes anyway.
        let signing_secret =
            lookup(SIGNING_SECRET_VAR).unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        Ok(Self {
            bucket,
            table,
            db: Path::new(&dir).join(db_file),
            port,
            public_url,
            signing_secret,
        })
    }
}
