use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::data::datatable::Table;
use crate::data::filter_rules::{Predicate, Rule};
use crate::data::row::RowRef;
use crate::data::row_store::RowId;
use crate::data::value::{compare_lexicographic, compare_numeric, Value};
use crate::error::{Result, TableError};

/// Sort direction for the order stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Lexicographic on the display string
    Asc,
    Desc,
    /// Numeric on the leading numeric prefix
    AscNumeric,
    DescNumeric,
}

impl SortDirection {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match self {
            SortDirection::Asc => compare_lexicographic(a, b),
            SortDirection::Desc => compare_lexicographic(a, b).reverse(),
            SortDirection::AscNumeric => compare_numeric(a, b),
            SortDirection::DescNumeric => compare_numeric(a, b).reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            "ASC_NUM" => Ok(SortDirection::AscNumeric),
            "DESC_NUM" => Ok(SortDirection::DescNumeric),
            _ => Err(TableError::InvalidSortDirection(s.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
            SortDirection::AscNumeric => "ASC_NUM",
            SortDirection::DescNumeric => "DESC_NUM",
        };
        write!(f, "{}", token)
    }
}

/// Anything `order_by` accepts as a direction: the enum itself or its token.
pub trait IntoSortDirection {
    fn into_sort_direction(self) -> Result<SortDirection>;
}

impl IntoSortDirection for SortDirection {
    fn into_sort_direction(self) -> Result<SortDirection> {
        Ok(self)
    }
}

impl IntoSortDirection for &str {
    fn into_sort_direction(self) -> Result<SortDirection> {
        self.parse()
    }
}

impl IntoSortDirection for String {
    fn into_sort_direction(self) -> Result<SortDirection> {
        self.parse()
    }
}

impl IntoSortDirection for &String {
    fn into_sort_direction(self) -> Result<SortDirection> {
        self.parse()
    }
}

/// A query over a snapshot of a table's rows.
///
/// Stages run in a fixed order when the query is evaluated: filter, group,
/// order, limit. Builder calls only record criteria, so they can be given in
/// any order and evaluation can be repeated. The table is borrowed for the
/// lifetime of the query and is never modified by it.
#[derive(Debug, Clone)]
pub struct Query<'t> {
    table: &'t Table,
    rows: Vec<RowId>,
    predicates: Vec<Predicate>,
    groups: Vec<String>,
    orders: Vec<(String, SortDirection)>,
    limits: Option<(usize, Option<usize>)>,
    position: usize,
}

impl<'t> Query<'t> {
    pub fn new(table: &'t Table) -> Self {
        Self {
            table,
            rows: table.row_ids(),
            predicates: Vec::new(),
            groups: Vec::new(),
            orders: Vec::new(),
            limits: None,
            position: 0,
        }
    }

    pub fn table(&self) -> &'t Table {
        self.table
    }

    /// Add filter rules. They combine with AND with the rules already present.
    pub fn filter_by<I>(mut self, rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = Rule>,
    {
        for rule in rules {
            let predicate = Predicate::compile(&rule, self.table)?;
            debug!(
                "Query: compiled rule {} {} {:?}",
                rule.column(),
                rule.operator(),
                rule.operand()
            );
            self.predicates.push(predicate);
        }
        Ok(self)
    }

    /// Add filter rules given as a JSON array of triples.
    pub fn filter_json(self, text: &str) -> Result<Self> {
        let rules = Rule::parse_json(text)?;
        self.filter_by(rules)
    }

    /// Add group columns. Only the first row of each distinct key is kept.
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add sort keys. Giving a column again changes its direction but keeps
    /// its place among the keys.
    pub fn order_by<I, S, D>(mut self, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: IntoSortDirection,
    {
        for (column, direction) in keys {
            let column = column.into();
            let direction = direction.into_sort_direction()?;
            match self.orders.iter_mut().find(|(name, _)| *name == column) {
                Some(existing) => existing.1 = direction,
                None => self.orders.push((column, direction)),
            }
        }
        Ok(self)
    }

    /// `limit(n, None)` keeps the first `n` rows. `limit(start, Some(n))`
    /// keeps `n` rows starting at position `start`.
    pub fn limit(mut self, count: usize, offset: Option<usize>) -> Self {
        self.limits = Some((count, offset));
        self
    }

    fn value_of<'r>(row: &RowRef<'r>, column: Option<usize>) -> &'r Value {
        const NULL: &Value = &Value::Null;
        column.and_then(|i| row.value_at(i)).unwrap_or(NULL)
    }

    fn apply_filter(&self, rows: Vec<RowRef<'t>>) -> Vec<RowRef<'t>> {
        if self.predicates.is_empty() {
            return rows;
        }
        let before = rows.len();
        let rows: Vec<_> = rows
            .into_iter()
            .filter(|row| self.predicates.iter().all(|p| p.matches(row.row())))
            .collect();
        debug!(
            "Query: filter kept {} of {} rows ({} rules)",
            rows.len(),
            before,
            self.predicates.len()
        );
        rows
    }

    fn apply_group(&self, rows: Vec<RowRef<'t>>) -> Vec<RowRef<'t>> {
        if self.groups.is_empty() {
            return rows;
        }
        let columns: Vec<Option<usize>> = self
            .groups
            .iter()
            .map(|name| self.table.column_index(name))
            .collect();

        let before = rows.len();
        let mut seen: HashSet<Vec<&'t Value>> = HashSet::new();
        let rows: Vec<_> = rows
            .into_iter()
            .filter(|row| {
                let key = columns.iter().map(|c| Self::value_of(row, *c)).collect();
                seen.insert(key)
            })
            .collect();
        debug!(
            "Query: grouping by {:?} reduced {} rows to {}",
            self.groups,
            before,
            rows.len()
        );
        rows
    }

    fn apply_order(&self, mut rows: Vec<RowRef<'t>>) -> Vec<RowRef<'t>> {
        if self.orders.is_empty() {
            return rows;
        }
        let keys: Vec<(Option<usize>, SortDirection)> = self
            .orders
            .iter()
            .map(|(name, direction)| (self.table.column_index(name), *direction))
            .collect();

        rows.sort_by(|a, b| {
            keys.iter()
                .map(|(column, direction)| {
                    direction.compare(Self::value_of(a, *column), Self::value_of(b, *column))
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        debug!("Query: sorted {} rows by {:?}", rows.len(), self.orders);
        rows
    }

    fn apply_limit(&self, rows: Vec<RowRef<'t>>) -> Vec<RowRef<'t>> {
        let Some((first, second)) = self.limits else {
            return rows;
        };
        let (start, count) = match second {
            None => (0, first),
            Some(count) => (first, count),
        };
        let before = rows.len();
        let rows: Vec<_> = rows.into_iter().skip(start).take(count).collect();
        debug!(
            "Query: limit {} from {} kept {} of {} rows",
            count,
            start,
            rows.len(),
            before
        );
        rows
    }

    /// Evaluate the query.
    pub fn get(&self) -> Vec<RowRef<'t>> {
        let table = self.table;
        let rows: Vec<RowRef<'t>> = self
            .rows
            .iter()
            .filter_map(|id| table.row_ref(*id))
            .collect();
        if rows.is_empty() {
            return rows;
        }

        let rows = self.apply_filter(rows);
        let rows = self.apply_group(rows);
        let rows = self.apply_order(rows);
        self.apply_limit(rows)
    }

    /// Handles of the result rows, usable after the query is gone.
    pub fn ids(&self) -> Vec<RowId> {
        self.get().iter().map(|row| row.id()).collect()
    }

    pub fn count(&self) -> usize {
        self.get().len()
    }

    /// Copy the result into a new table with the same configuration and columns.
    pub fn to_table(&self) -> Result<Table> {
        let mut result = Table::new(self.table.config().clone());
        for name in self.table.columns() {
            result.append_column(name, None)?;
        }
        for row in self.get() {
            result.append_values(row.values().to_vec());
        }
        debug!(
            "Query: materialized {} rows into table {}",
            result.count_rows(),
            result.id()
        );
        Ok(result)
    }

    // ---- cursor over the snapshot ----

    pub fn current(&self) -> Option<RowRef<'t>> {
        let id = self.rows.get(self.position)?;
        self.table.row_ref(*id)
    }

    pub fn key(&self) -> usize {
        self.position
    }

    pub fn valid(&self) -> bool {
        self.position < self.rows.len()
    }

    pub fn advance(&mut self) {
        self.position += 1;
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Reverse the snapshot order and rewind. Later evaluations see the
    /// reversed input.
    pub fn reverse(&mut self) {
        self.rows.reverse();
        self.rewind();
    }
}

impl<'t> IntoIterator for &Query<'t> {
    type Item = RowRef<'t>;
    type IntoIter = std::vec::IntoIter<RowRef<'t>>;

    fn into_iter(self) -> Self::IntoIter {
        self.get().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(count: usize) -> Table {
        let mut table = Table::default();
        table.append_column("n", None).unwrap();
        for i in 0..count {
            table.append_row(vec![i.to_string()]);
        }
        table
    }

    fn column(rows: &[RowRef<'_>], name: &str) -> Vec<String> {
        rows.iter()
            .map(|r| r.get(name).map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_limit_argument_forms() {
        let table = numbers(5);
        assert_eq!(column(&table.limit(2, None).get(), "n"), vec!["0", "1"]);
        assert_eq!(column(&table.limit(2, Some(1)).get(), "n"), vec!["2"]);
        assert_eq!(column(&table.limit(4, Some(5)).get(), "n"), vec!["4"]);
        assert!(table.limit(9, Some(2)).get().is_empty());

        // A later limit replaces the earlier one
        let q = table.query().limit(1, None).limit(3, None);
        assert_eq!(q.count(), 3);
    }

    #[test]
    fn test_sort_direction_tokens() {
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!(
            "Desc_Num".parse::<SortDirection>().unwrap(),
            SortDirection::DescNumeric
        );
        assert!(matches!(
            "UP".parse::<SortDirection>(),
            Err(TableError::InvalidSortDirection(_))
        ));
        assert!(numbers(2).order_by([("n", "sideways")]).is_err());
    }

    #[test]
    fn test_lexicographic_vs_numeric_order() {
        let mut table = Table::default();
        table.append_column("v", None).unwrap();
        for v in ["10", "9", "abc", "2x"] {
            table.append_row(vec![v]);
        }

        let lex = table.order_by([("v", "ASC")]).unwrap().get();
        assert_eq!(column(&lex, "v"), vec!["10", "2x", "9", "abc"]);

        let num = table.order_by([("v", SortDirection::AscNumeric)]).unwrap().get();
        assert_eq!(column(&num, "v"), vec!["abc", "2x", "9", "10"]);

        let desc = table.order_by([("v", "DESC_NUM")]).unwrap().get();
        assert_eq!(column(&desc, "v"), vec!["10", "9", "2x", "abc"]);
    }

    #[test]
    fn test_reordering_a_column_keeps_its_position() {
        let table = numbers(1);
        let q = table
            .query()
            .order_by([("a", "ASC"), ("b", "DESC")])
            .unwrap()
            .order_by([("a", "DESC_NUM")])
            .unwrap();
        assert_eq!(
            q.orders,
            vec![
                ("a".to_string(), SortDirection::DescNumeric),
                ("b".to_string(), SortDirection::Desc)
            ]
        );
    }

    #[test]
    fn test_group_keeps_first_row() {
        let mut table = Table::default();
        table.append_column("k", None).unwrap();
        table.append_column("v", None).unwrap();
        table.append_row(vec!["1", "a"]);
        table.append_row(vec!["1", "b"]);
        table.append_row(vec!["2", "c"]);

        let rows = table.group_by(["k"]).get();
        assert_eq!(column(&rows, "v"), vec!["a", "c"]);

        // Unknown group column is Null for every row: one group
        assert_eq!(table.group_by(["missing"]).count(), 1);
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let table = numbers(10);
        // Builder order does not matter: filter runs before limit
        let q = table
            .query()
            .limit(2, None)
            .order_by([("n", "DESC_NUM")])
            .unwrap()
            .filter_by([Rule::new("n", "<", 5)])
            .unwrap();
        assert_eq!(column(&q.get(), "n"), vec!["4", "3"]);
    }

    #[test]
    fn test_rules_accumulate() {
        let table = numbers(10);
        let q = table
            .filter_by([Rule::new("n", ">=", 3)])
            .unwrap()
            .filter_json(r#"[["n", "between", [0, 5]]]"#)
            .unwrap();
        assert_eq!(column(&q.get(), "n"), vec!["3", "4", "5"]);
        assert!(matches!(
            table.query().filter_json(r#"[["n", "~", 1]]"#),
            Err(TableError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_cursor_walks_snapshot() {
        let table = numbers(3);
        let mut q = table.query();
        let mut seen = Vec::new();
        while q.valid() {
            seen.push((q.key(), q.current().unwrap().get("n").unwrap().to_string()));
            q.advance();
        }
        assert_eq!(
            seen,
            vec![(0, "0".into()), (1, "1".into()), (2, "2".into())]
        );
        assert!(q.current().is_none());

        q.reverse();
        assert_eq!(q.key(), 0);
        assert_eq!(q.current().unwrap().get("n"), Some(&Value::text("2")));
        assert_eq!(column(&q.get(), "n"), vec!["2", "1", "0"]);
    }

    #[test]
    fn test_to_table_copies_result() {
        let table = numbers(4);
        let copy = table
            .filter_by([Rule::new("n", "!=", "1")])
            .unwrap()
            .to_table()
            .unwrap();
        assert_ne!(copy.id(), table.id());
        assert_eq!(copy.columns(), vec!["n"]);
        assert_eq!(copy.count_rows(), 3);
        assert_eq!(copy.config(), table.config());
    }

    #[test]
    fn test_to_table_keeps_null_distinct_from_empty() {
        let mut table = Table::default();
        table.append_column("v", None).unwrap();
        table.append_column("w", None).unwrap();
        table.append_row(vec!["", "x"]);
        table.append_row(vec!["", "y"]);
        table.row_mut(0).unwrap().set("v", Value::Null);

        assert_eq!(table.group_by(["v"]).count(), 2);

        let copy = table.query().to_table().unwrap();
        assert_eq!(copy.row(0).unwrap().get("v"), Some(&Value::Null));
        assert_eq!(copy.row(1).unwrap().get("v"), Some(&Value::empty()));
        assert_eq!(copy.group_by(["v"]).count(), 2);
    }

    #[test]
    fn test_ids_survive_query() {
        let mut table = numbers(3);
        let ids = table.filter_by([Rule::new("n", "=", "1")]).unwrap().ids();
        assert_eq!(ids.len(), 1);

        table.remove_row(1, false).unwrap();
        assert!(matches!(
            table.resolve(ids[0]),
            Err(TableError::UnknownRowHandle(_))
        ));
    }
}
