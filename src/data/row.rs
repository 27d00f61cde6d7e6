use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};

use crate::data::datatable::{ColumnResolver, Table, TableId};
use crate::data::row_store::RowId;
use crate::data::value::Value;
use crate::error::{Result, TableError};

/// Input for a new row, keyed by column name, by position, or both.
///
/// For every column the name-keyed value wins, then the position-keyed one;
/// `Null` entries count as missing. Unmatched columns get an empty string and
/// entries matching no column are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowData {
    named: HashMap<String, Value>,
    positional: HashMap<usize, Value>,
}

impl RowData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(column.into(), value.into());
        self
    }

    pub fn at(mut self, position: usize, value: impl Into<Value>) -> Self {
        self.positional.insert(position, value.into());
        self
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let named = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            named,
            positional: HashMap::new(),
        }
    }

    /// JSON arrays are positional, objects are keyed by name. Anything else
    /// becomes a single positional value.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Array(items) => items.iter().map(Value::from).collect::<Vec<_>>().into(),
            JsonValue::Object(obj) => obj.into(),
            other => RowData::new().at(0, Value::from(other)),
        }
    }

    fn lookup(&self, name: &str, position: usize) -> Value {
        self.named
            .get(name)
            .filter(|v| !v.is_null())
            .or_else(|| self.positional.get(&position).filter(|v| !v.is_null()))
            .cloned()
            .unwrap_or_else(Value::empty)
    }
}

impl<T: Into<Value>> From<Vec<T>> for RowData {
    fn from(values: Vec<T>) -> Self {
        let positional = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i, v.into()))
            .collect();
        Self {
            named: HashMap::new(),
            positional,
        }
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for RowData {
    fn from(values: [T; N]) -> Self {
        Vec::from(values).into()
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for RowData {
    fn from(map: HashMap<String, T>) -> Self {
        RowData::from_pairs(map)
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for RowData {
    fn from(map: BTreeMap<String, T>) -> Self {
        RowData::from_pairs(map)
    }
}

impl From<&Map<String, JsonValue>> for RowData {
    fn from(obj: &Map<String, JsonValue>) -> Self {
        RowData::from_pairs(obj.iter().map(|(k, v)| (k.clone(), Value::from(v))))
    }
}

/// One record, with values aligned to the owning table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    owner: TableId,
    values: Vec<Value>,
}

impl Row {
    /// Build a row against the current columns of `table`.
    pub fn new(data: impl Into<RowData>, table: Option<&dyn ColumnResolver>) -> Result<Self> {
        let table = table.ok_or_else(|| TableError::orphan_row("new row"))?;
        Ok(Self::build(&data.into(), table))
    }

    pub(crate) fn build(data: &RowData, table: &dyn ColumnResolver) -> Self {
        let values = (0..table.column_count())
            .map(|x| {
                let name = table.column_name(x).unwrap_or_default();
                data.lookup(name, x)
            })
            .collect();

        Self {
            owner: table.table_id(),
            values,
        }
    }

    pub(crate) fn from_values(owner: TableId, values: Vec<Value>) -> Self {
        Self { owner, values }
    }

    pub(crate) fn owner(&self) -> TableId {
        self.owner
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove the value at `index`, packing the remaining ones.
    pub(crate) fn remove_column_index(&mut self, index: usize) {
        if index < self.values.len() {
            self.values.remove(index);
        }
    }

    pub(crate) fn push_value(&mut self, value: Value) {
        self.values.push(value);
    }

    pub(crate) fn set_at(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    pub(crate) fn clear(&mut self) {
        for value in &mut self.values {
            *value = Value::empty();
        }
    }
}

/// Read access to a row together with the table it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'t> {
    table: &'t Table,
    id: RowId,
    row: &'t Row,
}

impl<'t> RowRef<'t> {
    pub(crate) fn new(table: &'t Table, id: RowId, row: &'t Row) -> Self {
        Self { table, id, row }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn row(&self) -> &'t Row {
        self.row
    }

    pub fn values(&self) -> &'t [Value] {
        self.row.values()
    }

    /// Value of the named column, `None` when the table has no such column.
    pub fn get(&self, name: &str) -> Option<&'t Value> {
        let index = self.table.resolve_column_index(name)?;
        self.row.value_at(index)
    }

    pub fn value_at(&self, index: usize) -> Option<&'t Value> {
        self.row.value_at(index)
    }

    /// Current key of this row in the table.
    pub fn index(&self) -> Option<usize> {
        self.table.key_of(self.id)
    }

    /// Name/value pairs in column order.
    pub fn to_array(&self) -> Vec<(&'t str, &'t Value)> {
        let table = self.table;
        table
            .column_iter()
            .map(|c| c.name())
            .zip(self.row.values())
            .collect()
    }

    pub fn to_json(&self) -> Map<String, JsonValue> {
        self.to_array()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect()
    }

    /// Append a copy of this row to another table, matching columns by name.
    /// Returns the other table's row count.
    pub fn append_to(&self, other: &mut Table) -> usize {
        other.append_values(self.values_for(other));
        other.count_rows()
    }

    /// Prepend a copy of this row to another table, matching columns by name.
    pub fn prepend_to(&self, other: &mut Table) -> usize {
        other.prepend_values(self.values_for(other));
        0
    }

    // Stored values are copied as-is, so Null stays Null.
    fn values_for(&self, other: &Table) -> Vec<Value> {
        other
            .column_iter()
            .map(|column| self.get(column.name()).cloned().unwrap_or_else(Value::empty))
            .collect()
    }
}

/// Write access to one row of a table.
#[derive(Debug)]
pub struct RowMut<'t> {
    table: &'t mut Table,
    id: RowId,
}

impl<'t> RowMut<'t> {
    pub(crate) fn new(table: &'t mut Table, id: RowId) -> Self {
        Self { table, id }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let index = self.table.resolve_column_index(name)?;
        self.table.row_by_id(self.id)?.value_at(index)
    }

    /// Set the named column. Unknown columns are ignored.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        if let Some(index) = self.table.resolve_column_index(name) {
            if let Some(row) = self.table.row_by_id_mut(self.id) {
                row.set_at(index, value.into());
            }
        }
        self
    }

    /// Reset every value of the row to the empty string.
    pub fn empty(&mut self) -> &mut Self {
        if let Some(row) = self.table.row_by_id_mut(self.id) {
            row.clear();
        }
        self
    }

    pub fn index(&self) -> Option<usize> {
        self.table.key_of(self.id)
    }

    pub fn as_row_ref(&self) -> Option<RowRef<'_>> {
        self.table.resolve(self.id).ok()
    }

    /// Remove this row from its table.
    pub fn remove(self, compact: bool) -> Result<()> {
        let key = self
            .table
            .key_of(self.id)
            .ok_or_else(|| TableError::UnknownRowHandle(self.id.to_string()))?;
        self.table.remove_row(key, compact)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orphan_row_is_rejected() {
        let result = Row::new(vec!["a", "b"], None);
        assert!(matches!(
            result,
            Err(TableError::OrphanEntity { entity: "row", .. })
        ));
    }

    #[test]
    fn test_name_wins_over_position() {
        let mut table = Table::default();
        table.append_column("a", None).unwrap();
        table.append_column("b", None).unwrap();

        let data = RowData::new().at(0, "pos0").at(1, "pos1").with("b", "named");
        let row = Row::new(data, Some(&table)).unwrap();
        assert_eq!(row.values(), &[Value::text("pos0"), Value::text("named")]);
    }

    #[test]
    fn test_null_entries_count_as_missing() {
        let mut table = Table::default();
        table.append_column("a", None).unwrap();

        let data = RowData::new().with("a", Value::Null).at(0, "fallback");
        let row = Row::new(data, Some(&table)).unwrap();
        assert_eq!(row.values(), &[Value::text("fallback")]);
    }

    #[test]
    fn test_from_json_object_and_array() {
        let mut table = Table::default();
        table.append_column("id", None).unwrap();
        table.append_column("name", None).unwrap();

        let obj = serde_json::json!({"name": "Alice", "id": 7, "extra": true});
        let row = Row::new(RowData::from_json(&obj), Some(&table)).unwrap();
        assert_eq!(row.values(), &[Value::Number(7.0), Value::text("Alice")]);

        let arr = serde_json::json!(["1"]);
        let row = Row::new(RowData::from_json(&arr), Some(&table)).unwrap();
        assert_eq!(row.values(), &[Value::text("1"), Value::empty()]);
    }

    #[test]
    fn test_row_mut_set_and_empty() {
        let mut table = Table::default();
        table.append_column("a", None).unwrap();
        table.append_column("b", None).unwrap();
        table.append_row(vec!["1", "2"]);

        {
            let mut row = table.row_mut(0).unwrap();
            row.set("b", "two").set("missing", "ignored");
            assert_eq!(row.get("b"), Some(&Value::text("two")));
            assert_eq!(row.get("missing"), None);
        }
        assert_eq!(table.row(0).unwrap().get("b"), Some(&Value::text("two")));

        table.row_mut(0).unwrap().empty();
        assert_eq!(
            table.row(0).unwrap().values(),
            &[Value::empty(), Value::empty()]
        );
    }

    #[test]
    fn test_row_mut_remove_through_handle() {
        let mut table = Table::default();
        table.append_column("a", None).unwrap();
        table.append_row(vec!["1"]);
        let id = table.append_row(vec!["2"]);

        {
            let mut row = table.resolve_mut(id).unwrap();
            assert_eq!(row.index(), Some(1));
            row.set("a", "two");
            let view = row.as_row_ref().unwrap();
            assert_eq!(view.to_array(), vec![("a", &Value::text("two"))]);
            assert_eq!(view.to_json()["a"], serde_json::json!("two"));
            row.remove(false).unwrap();
        }

        assert_eq!(table.count_rows(), 1);
        assert!(table.row(1).is_none());
        assert!(matches!(
            table.resolve_mut(id),
            Err(TableError::UnknownRowHandle(_))
        ));
    }

    #[test]
    fn test_append_to_other_table_matches_names() {
        let mut source = Table::default();
        source.append_column("id", None).unwrap();
        source.append_column("name", None).unwrap();
        source.append_row(vec!["1", "Alice"]);

        let mut target = Table::default();
        target.append_column("name", None).unwrap();
        target.append_column("city", None).unwrap();
        target.append_row(vec!["Bob", "Paris"]);

        let count = source.row(0).unwrap().append_to(&mut target);
        assert_eq!(count, 2);
        assert_eq!(
            target.row(1).unwrap().values(),
            &[Value::text("Alice"), Value::empty()]
        );

        assert_eq!(source.row(0).unwrap().prepend_to(&mut target), 0);
        assert_eq!(target.row(0).unwrap().get("name"), Some(&Value::text("Alice")));
    }

    #[test]
    fn test_copied_row_keeps_null() {
        let mut source = Table::default();
        source.append_column("a", None).unwrap();
        source.append_column("b", None).unwrap();
        source.append_row(vec!["1", "2"]);
        source.row_mut(0).unwrap().set("b", Value::Null);

        let mut target = Table::default();
        target.append_column("b", None).unwrap();
        target.append_column("a", None).unwrap();

        source.row(0).unwrap().append_to(&mut target);
        assert_eq!(
            target.row(0).unwrap().values(),
            &[Value::Null, Value::text("1")]
        );

        source.row(0).unwrap().prepend_to(&mut target);
        assert_eq!(target.row(0).unwrap().get("b"), Some(&Value::Null));
        assert_eq!(target.count_rows(), 2);
    }
}
