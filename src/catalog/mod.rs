//! Table/column/index metadata registry. Tables are registered by name and
//! carry their columns and named `Index` entries (ordered columns, unique
//! and primary flags, and an engine-specific attributes bag).

pub mod statistics;

use crate::error::OptimizerError;
use crate::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub use statistics::{ColumnStatistics, Histogram, HistogramBucket, TableStatistics};

/// Supported column types. `Json`/`Vector` are carried through to the
/// expression model but are not index-selectable by the default selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    BigInt,
    Float,
    Double,
    Varchar(usize),
    Text,
    Boolean,
    Date,
    Timestamp,
    Json,
    Vector(usize),
}

impl DataType {
    /// Whether a B-tree index over this type is meaningful. Large/opaque
    /// types are excluded from the advisor's candidate extraction.
    pub fn is_indexable(&self) -> bool {
        !matches!(self, DataType::Json | DataType::Text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub default: Option<String>,
}

/// A named index on an ordered column list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
    /// Engine-specific extensions (e.g. full-text, spatial) the core
    /// doesn't interpret but passes through to the selector's hint bias.
    pub attributes: HashMap<String, String>,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            unique: false,
            primary: false,
            attributes: HashMap::new(),
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.unique = true;
        self
    }

    /// The length of the leading column run shared with `predicate_columns`,
    /// in order. Used by the index selector's coverage score.
    pub fn matching_prefix_len(&self, predicate_columns: &[String]) -> usize {
        self.columns
            .iter()
            .zip(predicate_columns)
            .take_while(|(a, b)| a == b)
            .count()
    }

    pub fn is_covering(&self, required_columns: &[String]) -> bool {
        required_columns.iter().all(|c| self.columns.contains(c))
    }
}

/// Full metadata for one table: its ordered columns and its indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            indexes: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn indexes_on(&self, column: &str) -> impl Iterator<Item = &Index> {
        self.indexes.iter().filter(move |ix| ix.columns.first().map(|c| c == column).unwrap_or(false))
    }
}

/// Read-mostly registry of table metadata and statistics. Whole-table
/// replacement on refresh keeps readers from ever observing a torn update.
#[derive(Clone)]
pub struct Catalog {
    tables: Arc<RwLock<HashMap<String, TableInfo>>>,
    statistics: Arc<RwLock<HashMap<String, TableStatistics>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            statistics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register_table(&self, table: TableInfo) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(&table.name) {
            return Err(OptimizerError::catalog(format!(
                "table {} already registered",
                table.name
            )));
        }
        tables.insert(table.name.clone(), table);
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Result<TableInfo> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| OptimizerError::catalog(format!("table {} not found", name)))
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        self.tables
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| OptimizerError::catalog(format!("table {} not found", name)))
    }

    pub fn list_tables(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Atomically replace a table's statistics. Concurrent readers observe
    /// either the old or the new snapshot, never a partial one.
    pub fn refresh_statistics(&self, table: &str, stats: TableStatistics) {
        self.statistics.write().insert(table.to_string(), stats);
    }

    pub fn get_statistics(&self, table: &str) -> Option<TableStatistics> {
        self.statistics.read().get(table).cloned()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
