//! Index loading service
//!
//! Reads a JSON array of records and builds a `TreeIndex` with the configured
//! build options.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{IndexBuilder, TreeIndex};
use crate::infrastructure::traits::FileSystem;

/// Service for loading records and building tree indexes.
pub struct IndexService {
    fs: Arc<dyn FileSystem>,
    builder: IndexBuilder,
}

impl IndexService {
    /// Create a new index service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self {
            fs,
            builder: settings.index_builder(),
        }
    }

    /// Replace the configured build options.
    pub fn with_builder(mut self, builder: IndexBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Read and index the records in `path`.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<TreeIndex> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::InvalidInput {
                path: path.to_path_buf(),
                message: "not a file".to_string(),
            });
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read records", path)?;
        let items = Self::parse_records(&content, path)?;
        debug!("load: {} records from {}", items.len(), path.display());
        self.build(items)
    }

    /// Index records that are already in memory.
    pub fn build(&self, items: Vec<Value>) -> ApplicationResult<TreeIndex> {
        Ok(self.builder.build(items)?)
    }

    /// Parse file content; the top level must be a JSON array.
    pub fn parse_records(content: &str, path: &Path) -> ApplicationResult<Vec<Value>> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ApplicationError::InvalidInput {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        match value {
            Value::Array(items) => Ok(items),
            _ => Err(ApplicationError::InvalidInput {
                path: path.to_path_buf(),
                message: "expected a JSON array of records".to_string(),
            }),
        }
    }
}
