//! Configuration module
//!
//! Table configuration plus the option sets used when saving and exporting.

pub mod config;

pub use config::{Config, SaveOptions, XmlOptions};
