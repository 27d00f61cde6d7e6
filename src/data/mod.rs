//! Data layer: the table model, its loaders and exporters, and the query
//! engine that runs over it.

// Core data modules
pub mod datatable;
pub mod row;
pub mod row_store;
pub mod value;

// Loading and export
pub mod csv_loader;
pub mod data_exporter;

// Query execution
pub mod filter_rules;
pub mod query_engine;
pub mod validators;
