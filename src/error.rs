use thiserror::Error;

/// Canonical result for table, row and query operations.
pub type Result<T> = std::result::Result<T, TableError>;

#[derive(Debug, Error)]
pub enum TableError {
    /// A row or column was built without an owning table, or is being
    /// resolved against a table it does not belong to.
    #[error("{entity} '{name}' is not attached to this table")]
    OrphanEntity { entity: &'static str, name: String },

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("column '{0}' does not exist")]
    UnknownColumn(String),

    #[error("row {0} does not exist")]
    UnknownRowIndex(usize),

    /// The handle points at a row that has since been removed.
    #[error("row handle {0} refers to a removed row")]
    UnknownRowHandle(String),

    #[error("invalid operator '{0}' in filter rules")]
    UnknownOperator(String),

    #[error("invalid operand for '{operator}': expected {expected}, got {got}")]
    InvalidOperandType {
        operator: String,
        expected: &'static str,
        got: String,
    },

    #[error("unknown validator '{0}'")]
    UnknownValidator(String),

    #[error("rules must contain at least 3 parameters: {0}")]
    MalformedRule(String),

    #[error("the order type '{0}' is not valid")]
    InvalidSortDirection(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl TableError {
    pub(crate) fn orphan_column(name: &str) -> Self {
        TableError::OrphanEntity {
            entity: "column",
            name: name.to_string(),
        }
    }

    pub(crate) fn orphan_row(name: impl Into<String>) -> Self {
        TableError::OrphanEntity {
            entity: "row",
            name: name.into(),
        }
    }
}
