//! Record sources: where raw tables come from.
//!
//! A [`RecordSource`] turns a (table name, location) pair into a raw [`Table`]
//! whose cells are untyped text or null. Two origins are provided: delimited
//! files on the local disk and objects fetched from an [`ObjectStore`].

use std::{
    fs::{self, File},
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
};

use encoding_rs::Encoding;
use log::info;
use thiserror::Error;

use crate::{
    data::{Table, TableSet},
    error::EtlError,
    io_utils,
};

pub trait RecordSource {
    fn fetch(&self, name: &str, location: &str) -> Result<Table, EtlError>;
}

/// How raw delimited text is interpreted, shared by every source.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub null_tokens: Vec<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: encoding_rs::UTF_8,
            null_tokens: io_utils::DEFAULT_NULL_TOKENS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

fn load_failure(name: &str, reason: impl ToString) -> EtlError {
    EtlError::SourceLoad {
        table: name.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalFileSource {
    options: ReadOptions,
}

impl LocalFileSource {
    pub fn new(options: ReadOptions) -> Self {
        Self { options }
    }
}

impl RecordSource for LocalFileSource {
    fn fetch(&self, name: &str, location: &str) -> Result<Table, EtlError> {
        let path = Path::new(location);
        let file = File::open(path)
            .map_err(|err| load_failure(name, format!("opening {path:?}: {err}")))?;
        let delimiter = io_utils::resolve_input_delimiter(location, self.options.delimiter);
        let table = io_utils::read_table(
            BufReader::new(file),
            delimiter,
            self.options.encoding,
            &self.options.null_tokens,
        )
        .map_err(|err| load_failure(name, format!("{err:#}")))?;
        info!("{name} data loaded successfully ({} row(s)).", table.len());
        Ok(table)
    }
}

#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("No object storage credentials found")]
    MissingCredentials,

    #[error("Object '{key}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },

    #[error("Object storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Minimal object-storage client: fetch the full body of one object.
///
/// Networked clients report absent credentials as
/// [`ObjectStoreError::MissingCredentials`]; [`DirectoryObjectStore`] needs none.
pub trait ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError>;
}

/// Serves buckets as sub-directories of a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectStore for DirectoryObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.root.join(bucket).join(key.trim_start_matches('/'));
        fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            _ => ObjectStoreError::Io(err),
        })
    }
}

pub struct ObjectStoreSource<S> {
    store: S,
    bucket: String,
    options: ReadOptions,
}

impl<S: ObjectStore> ObjectStoreSource<S> {
    pub fn new(store: S, bucket: impl Into<String>, options: ReadOptions) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            options,
        }
    }
}

impl<S: ObjectStore> RecordSource for ObjectStoreSource<S> {
    fn fetch(&self, name: &str, location: &str) -> Result<Table, EtlError> {
        let body = self
            .store
            .get_object(&self.bucket, location)
            .map_err(|err| load_failure(name, err))?;
        let delimiter = io_utils::resolve_input_delimiter(location, self.options.delimiter);
        let table = io_utils::read_table(
            body.as_slice(),
            delimiter,
            self.options.encoding,
            &self.options.null_tokens,
        )
        .map_err(|err| load_failure(name, format!("{err:#}")))?;
        info!(
            "{name} data loaded successfully from {}/{location} ({} row(s)).",
            self.bucket,
            table.len()
        );
        Ok(table)
    }
}

/// Loads every configured table, stopping at the first failure.
pub fn extract<'a, I>(source: &dyn RecordSource, locations: I) -> Result<TableSet, EtlError>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut tables = TableSet::new();
    for (name, location) in locations {
        let table = source.fetch(name, location)?;
        tables.insert(name.clone(), table);
    }
    Ok(tables)
}
