//! Filter rules and the predicates compiled from them.
//!
//! A rule is a `(column, operator, operand)` triple, built in code or read
//! from a JSON array such as `["age", ">=", 30]`. Rules are checked and
//! compiled once, against the table's current columns, into a [`Predicate`]
//! that the query evaluates per row.

use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::data::datatable::ColumnResolver;
use crate::data::row::Row;
use crate::data::validators::Validator;
use crate::data::value::{compare_values, Value};
use crate::error::{Result, TableError};

/// Right-hand side of a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(Value),
    List(Vec<Value>),
}

impl Operand {
    fn describe(&self) -> String {
        match self {
            Operand::Scalar(v) => format!("scalar '{}'", v),
            Operand::List(items) => format!("list of {} values", items.len()),
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Scalar(v)
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Scalar(s.into())
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::Scalar(s.into())
    }
}

impl From<f64> for Operand {
    fn from(n: f64) -> Self {
        Operand::Scalar(n.into())
    }
}

impl From<i64> for Operand {
    fn from(n: i64) -> Self {
        Operand::Scalar(n.into())
    }
}

impl From<i32> for Operand {
    fn from(n: i32) -> Self {
        Operand::Scalar(n.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(items: Vec<T>) -> Self {
        Operand::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Operand {
    fn from(items: [T; N]) -> Self {
        Vec::from(items).into()
    }
}

fn is_scalar(json: &JsonValue) -> bool {
    !matches!(json, JsonValue::Array(_) | JsonValue::Object(_))
}

impl TryFrom<&JsonValue> for Operand {
    type Error = TableError;

    /// Scalars and flat arrays of scalars. Objects and nested arrays are
    /// rejected; the operator name is filled in by the caller.
    fn try_from(json: &JsonValue) -> Result<Self> {
        match json {
            JsonValue::Array(items) if items.iter().all(is_scalar) => {
                Ok(Operand::List(items.iter().map(Value::from).collect()))
            }
            JsonValue::Array(_) => Err(TableError::InvalidOperandType {
                operator: String::new(),
                expected: "a list of scalar values",
                got: json.to_string(),
            }),
            JsonValue::Object(_) => Err(TableError::InvalidOperandType {
                operator: String::new(),
                expected: "a scalar or a list of scalars",
                got: json.to_string(),
            }),
            other => Ok(Operand::Scalar(Value::from(other))),
        }
    }
}

/// Comparison operators understood by the filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    NotContains,
    Between,
    NotBetween,
    Is,
}

impl FromStr for Operator {
    type Err = TableError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "=" => Ok(Operator::Equals),
            "!=" => Ok(Operator::NotEquals),
            ">" => Ok(Operator::GreaterThan),
            ">=" => Ok(Operator::GreaterOrEqual),
            "<" => Ok(Operator::LessThan),
            "<=" => Ok(Operator::LessOrEqual),
            "contains" => Ok(Operator::Contains),
            "not_contains" => Ok(Operator::NotContains),
            "between" => Ok(Operator::Between),
            "not_between" => Ok(Operator::NotBetween),
            "is" => Ok(Operator::Is),
            _ => Err(TableError::UnknownOperator(s.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::Between => "between",
            Operator::NotBetween => "not_between",
            Operator::Is => "is",
        };
        write!(f, "{}", token)
    }
}

/// One filter condition. The operator is kept as given and only checked
/// when the rule is applied to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    column: String,
    operator: String,
    operand: Operand,
}

impl Rule {
    pub fn new(
        column: impl Into<String>,
        operator: impl Into<String>,
        operand: impl Into<Operand>,
    ) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            operand: operand.into(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Parse a JSON array of rule triples.
    pub fn parse_list(json: &JsonValue) -> Result<Vec<Rule>> {
        match json {
            JsonValue::Array(items) => items.iter().map(Rule::try_from).collect(),
            other => Err(TableError::MalformedRule(other.to_string())),
        }
    }

    /// Parse rules from JSON text, e.g. `[["age", ">", 30]]`.
    pub fn parse_json(text: &str) -> Result<Vec<Rule>> {
        let json: JsonValue = serde_json::from_str(text)?;
        Rule::parse_list(&json)
    }
}

impl TryFrom<&JsonValue> for Rule {
    type Error = TableError;

    /// Elements past the third are ignored.
    fn try_from(json: &JsonValue) -> Result<Self> {
        let items = match json {
            JsonValue::Array(items) if items.len() >= 3 => items,
            other => return Err(TableError::MalformedRule(other.to_string())),
        };

        let column = Value::from(&items[0]).to_string();
        let operator = Value::from(&items[1]).to_string();
        let operand = Operand::try_from(&items[2]).map_err(|e| match e {
            TableError::InvalidOperandType { expected, got, .. } => {
                TableError::InvalidOperandType {
                    operator: operator.clone(),
                    expected,
                    got,
                }
            }
            other => other,
        })?;
        Ok(Rule::new(column, operator, operand))
    }
}

/// A rule checked against a table and ready to evaluate.
///
/// Column positions are resolved at compile time; a missing column is
/// `None` and reads as `Null` for every row.
#[derive(Debug, Clone)]
pub(crate) enum Predicate {
    Compare {
        column: Option<usize>,
        operator: Operator,
        operand: Value,
    },
    Contains {
        column: Option<usize>,
        needle: String,
        negated: bool,
    },
    Between {
        column: Option<usize>,
        low: Value,
        high: Value,
    },
    NotBetween {
        column: Option<usize>,
        low: Value,
        high: Value,
    },
    ValidatesAs {
        column: Option<usize>,
        validator: Validator,
    },
}

impl Predicate {
    pub fn compile(rule: &Rule, table: &dyn ColumnResolver) -> Result<Self> {
        let operator: Operator = rule.operator.parse()?;
        let column = table.resolve_column_index(&rule.column);

        let invalid = |expected: &'static str| TableError::InvalidOperandType {
            operator: operator.to_string(),
            expected,
            got: rule.operand.describe(),
        };

        match operator {
            Operator::Between | Operator::NotBetween => {
                let (low, high) = match &rule.operand {
                    Operand::List(items) if items.len() == 2 => {
                        (items[0].clone(), items[1].clone())
                    }
                    _ => return Err(invalid("a list of exactly two values")),
                };
                if operator == Operator::Between {
                    Ok(Predicate::Between { column, low, high })
                } else {
                    Ok(Predicate::NotBetween { column, low, high })
                }
            }
            _ => {
                let operand = match &rule.operand {
                    Operand::Scalar(v) => v.clone(),
                    Operand::List(_) => return Err(invalid("a scalar value")),
                };
                match operator {
                    Operator::Contains | Operator::NotContains => Ok(Predicate::Contains {
                        column,
                        needle: operand.to_string(),
                        negated: operator == Operator::NotContains,
                    }),
                    Operator::Is => Ok(Predicate::ValidatesAs {
                        column,
                        validator: operand.to_string().parse()?,
                    }),
                    _ => Ok(Predicate::Compare {
                        column,
                        operator,
                        operand,
                    }),
                }
            }
        }
    }

    fn cell<'r>(row: &'r Row, column: Option<usize>) -> &'r Value {
        const NULL: &Value = &Value::Null;
        column.and_then(|i| row.value_at(i)).unwrap_or(NULL)
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Predicate::Compare {
                column,
                operator,
                operand,
            } => {
                let ord = compare_values(Self::cell(row, *column), operand);
                match operator {
                    Operator::Equals => ord == Ordering::Equal,
                    Operator::NotEquals => ord != Ordering::Equal,
                    Operator::GreaterThan => ord == Ordering::Greater,
                    Operator::GreaterOrEqual => ord != Ordering::Less,
                    Operator::LessThan => ord == Ordering::Less,
                    Operator::LessOrEqual => ord != Ordering::Greater,
                    _ => false,
                }
            }
            Predicate::Contains {
                column,
                needle,
                negated,
            } => {
                let found = Self::cell(row, *column).as_text().contains(needle.as_str());
                found != *negated
            }
            Predicate::Between { column, low, high } => {
                let cell = Self::cell(row, *column);
                compare_values(cell, low) != Ordering::Less
                    && compare_values(cell, high) != Ordering::Greater
            }
            Predicate::NotBetween { column, low, high } => {
                let cell = Self::cell(row, *column);
                compare_values(cell, low) == Ordering::Less
                    || compare_values(cell, high) == Ordering::Greater
            }
            Predicate::ValidatesAs { column, validator } => {
                validator.validate(&Self::cell(row, *column).as_text())
            }
        }
    }
}
