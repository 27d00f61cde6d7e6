use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::config::config::Config;
use crate::data::query_engine::{IntoSortDirection, Query};
use crate::data::filter_rules::Rule;
use crate::data::row::{Row, RowData, RowMut, RowRef};
use crate::data::row_store::{RowId, RowStore};
use crate::data::value::Value;
use crate::error::{Result, TableError};

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a table, the non-owning handle rows and columns keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(u64);

impl TableId {
    pub(crate) fn next() -> Self {
        TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// The narrow surface rows and columns use to reach their table.
pub trait ColumnResolver {
    fn table_id(&self) -> TableId;

    /// Current position of the named column, if the table has it.
    fn resolve_column_index(&self, name: &str) -> Option<usize>;

    fn column_count(&self) -> usize;

    fn column_name(&self, index: usize) -> Option<&str>;
}

/// A named field definition shared by all rows of a table.
///
/// The position is never stored; it is looked up in the owning table each
/// time, so removing an earlier column shifts it automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    owner: Option<TableId>,
}

impl Column {
    /// A column not attached to any table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
        }
    }

    fn attached(name: String, owner: TableId) -> Self {
        Self {
            name,
            owner: Some(owner),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_orphan(&self) -> bool {
        self.owner.is_none()
    }

    fn check_owner(&self, table: &dyn ColumnResolver) -> Result<()> {
        match self.owner {
            Some(owner) if owner == table.table_id() => Ok(()),
            _ => Err(TableError::orphan_column(&self.name)),
        }
    }

    pub fn index(&self, table: &dyn ColumnResolver) -> Result<usize> {
        self.check_owner(table)?;
        table
            .resolve_column_index(&self.name)
            .ok_or_else(|| TableError::UnknownColumn(self.name.clone()))
    }

    /// This column's value in every row, in row order.
    pub fn values<'t>(&self, table: &'t Table) -> Result<Vec<&'t Value>> {
        let index = self.index(table)?;
        Ok(table
            .rows()
            .into_iter()
            .filter_map(|row| row.value_at(index))
            .collect())
    }

    /// Distinct values of this column, first occurrence first.
    pub fn unique<'t>(&self, table: &'t Table) -> Result<Vec<&'t Value>> {
        let mut seen = HashSet::new();
        Ok(self
            .values(table)?
            .into_iter()
            .filter(|v| seen.insert(*v))
            .collect())
    }
}

/// An in-memory table: ordered columns plus an ordered sequence of rows.
///
/// Every row always holds exactly one value per column. Row keys follow the
/// table order; removing a row without compaction leaves its key empty.
#[derive(Debug)]
pub struct Table {
    id: TableId,
    config: Config,
    columns: Vec<Column>,
    store: RowStore,
}

impl Default for Table {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ColumnResolver for Table {
    fn table_id(&self) -> TableId {
        self.id
    }

    fn resolve_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.name.as_str())
    }
}

impl Table {
    pub fn new(config: Config) -> Self {
        let id = TableId::next();
        Self {
            id,
            config,
            columns: Vec::new(),
            store: RowStore::new(id),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn count_rows(&self) -> usize {
        self.store.len()
    }

    pub fn count_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    // ---- columns ----

    /// Append a column, giving every existing row `default` (or an empty string).
    pub fn append_column(
        &mut self,
        name: impl Into<String>,
        default: Option<Value>,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.resolve_column_index(&name).is_some() {
            return Err(TableError::DuplicateColumn(name));
        }

        let fill = Value::Text(default.map(|v| v.to_string()).unwrap_or_default());
        debug!(
            "Table {}: appending column '{}' to {} rows",
            self.id,
            name,
            self.store.len()
        );

        self.columns.push(Column::attached(name, self.id));
        for row in self.store.rows_mut() {
            row.push_value(fill.clone());
        }
        Ok(self)
    }

    /// Remove a column and its value from every row.
    pub fn remove_column(&mut self, name: &str) -> Result<&mut Self> {
        let index = self
            .resolve_column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;

        debug!("Table {}: removing column '{}' at {}", self.id, name, index);
        for row in self.store.rows_mut() {
            row.remove_column_index(index);
        }
        self.columns.remove(index);
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order
    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_iter(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.resolve_column_index(name)
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        self.column(name).and_then(|c| c.values(self).ok())
    }

    pub fn column_unique(&self, name: &str) -> Option<Vec<&Value>> {
        self.column(name).and_then(|c| c.unique(self).ok())
    }

    /// Set the named column to the empty string in every row.
    pub fn clear_column(&mut self, name: &str) -> Result<&mut Self> {
        let index = self
            .resolve_column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;
        for row in self.store.rows_mut() {
            row.set_at(index, Value::empty());
        }
        Ok(self)
    }

    // ---- rows ----

    pub fn append_row(&mut self, data: impl Into<RowData>) -> RowId {
        let row = Row::build(&data.into(), self);
        self.store.push_back(row)
    }

    pub fn prepend_row(&mut self, data: impl Into<RowData>) -> RowId {
        let row = Row::build(&data.into(), self);
        self.store.push_front(row)
    }

    /// Store already-aligned values, padded or truncated to the column count.
    pub(crate) fn append_values(&mut self, values: Vec<Value>) -> RowId {
        let row = self.aligned(values);
        self.store.push_back(row)
    }

    pub(crate) fn prepend_values(&mut self, values: Vec<Value>) -> RowId {
        let row = self.aligned(values);
        self.store.push_front(row)
    }

    fn aligned(&self, mut values: Vec<Value>) -> Row {
        values.resize(self.columns.len(), Value::empty());
        Row::from_values(self.id, values)
    }

    pub fn row(&self, key: usize) -> Option<RowRef<'_>> {
        let id = self.store.id_at(key)?;
        self.row_ref(id)
    }

    pub fn row_mut(&mut self, key: usize) -> Option<RowMut<'_>> {
        let id = self.store.id_at(key)?;
        Some(RowMut::new(self, id))
    }

    /// All rows in table order
    pub fn rows(&self) -> Vec<RowRef<'_>> {
        self.store
            .ids()
            .into_iter()
            .filter_map(|id| self.row_ref(id))
            .collect()
    }

    /// Handles of all rows in table order.
    pub fn row_ids(&self) -> Vec<RowId> {
        self.store.ids()
    }

    /// Row keys in table order; keys of removed rows are skipped.
    pub fn row_keys(&self) -> Vec<usize> {
        self.store.entries().map(|(key, _)| key).collect()
    }

    pub(crate) fn row_ref(&self, id: RowId) -> Option<RowRef<'_>> {
        let row = self.store.get(id)?;
        Some(RowRef::new(self, id, row))
    }

    pub(crate) fn row_by_id(&self, id: RowId) -> Option<&Row> {
        self.store.get(id)
    }

    pub(crate) fn row_by_id_mut(&mut self, id: RowId) -> Option<&mut Row> {
        self.store.get_mut(id)
    }

    pub(crate) fn key_of(&self, id: RowId) -> Option<usize> {
        self.store.key_of(id)
    }

    fn check_handle(&self, id: RowId) -> Result<()> {
        if id.table() != self.id {
            return Err(TableError::orphan_row(id.to_string()));
        }
        if self.store.get(id).is_none() {
            return Err(TableError::UnknownRowHandle(id.to_string()));
        }
        Ok(())
    }

    /// Resolve a handle taken earlier, e.g. from a query result.
    pub fn resolve(&self, id: RowId) -> Result<RowRef<'_>> {
        self.check_handle(id)?;
        self.row_ref(id)
            .ok_or_else(|| TableError::UnknownRowHandle(id.to_string()))
    }

    pub fn resolve_mut(&mut self, id: RowId) -> Result<RowMut<'_>> {
        self.check_handle(id)?;
        Ok(RowMut::new(self, id))
    }

    /// Remove the row stored under `key`. With `compact` the remaining keys
    /// are renumbered contiguously.
    pub fn remove_row(&mut self, key: usize, compact: bool) -> Result<&mut Self> {
        if self.store.remove_key(key).is_none() {
            return Err(TableError::UnknownRowIndex(key));
        }
        if compact {
            self.store.compact();
        }
        debug!(
            "Table {}: removed row {} ({} rows left)",
            self.id,
            key,
            self.store.len()
        );
        Ok(self)
    }

    /// Remove several rows. All keys are checked before anything is removed.
    pub fn remove_rows(&mut self, keys: &[usize], compact: bool) -> Result<&mut Self> {
        let mut seen = HashSet::new();
        for &key in keys {
            if self.store.id_at(key).is_none() || !seen.insert(key) {
                return Err(TableError::UnknownRowIndex(key));
            }
        }

        for &key in keys {
            self.store.remove_key(key);
        }
        if compact {
            self.store.compact();
        }
        debug!(
            "Table {}: removed {} rows ({} rows left)",
            self.id,
            keys.len(),
            self.store.len()
        );
        Ok(self)
    }

    /// Run `f` on every row in table order.
    pub fn each_row<F>(&mut self, mut f: F) -> &mut Self
    where
        F: FnMut(RowMut<'_>),
    {
        for id in self.store.ids() {
            f(RowMut::new(self, id));
        }
        self
    }

    // ---- queries ----

    /// Start a query over the current rows.
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    pub fn filter_by<I>(&self, rules: I) -> Result<Query<'_>>
    where
        I: IntoIterator<Item = Rule>,
    {
        self.query().filter_by(rules)
    }

    pub fn group_by<I, S>(&self, columns: I) -> Query<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query().group_by(columns)
    }

    pub fn order_by<I, S, D>(&self, keys: I) -> Result<Query<'_>>
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: IntoSortDirection,
    {
        self.query().order_by(keys)
    }

    pub fn limit(&self, count: usize, offset: Option<usize>) -> Query<'_> {
        self.query().limit(count, offset)
    }
}
