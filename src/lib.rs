//! In-memory tabular data engine.
//!
//! Load delimited text into a [`Table`], mutate its rows and columns, then
//! filter, group, sort and limit it through a [`Query`] and export the result
//! as CSV, JSON or XML.

pub mod config;
pub mod data;
pub mod error;
pub mod logging;

pub use config::{Config, SaveOptions, XmlOptions};
pub use data::datatable::{Column, ColumnResolver, Table, TableId};
pub use data::filter_rules::{Operand, Operator, Rule};
pub use data::query_engine::{IntoSortDirection, Query, SortDirection};
pub use data::row::{Row, RowData, RowMut, RowRef};
pub use data::row_store::RowId;
pub use data::validators::Validator;
pub use data::value::Value;
pub use error::{Result, TableError};
