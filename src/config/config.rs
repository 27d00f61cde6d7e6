use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, TableError};

/// Table configuration, fixed when the table is built.
///
/// Missing keys take their defaults and unknown keys are ignored, so a
/// partial JSON object or TOML file overrides only what it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Field delimiter
    pub separator: String,

    /// Quote character wrapped around non-numeric fields
    pub enclosure: String,

    /// Whether the first record holds the column names
    pub header: bool,
}

/// Options for writing a table back to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Write the column names as the first line
    pub header: bool,

    /// Append to the file instead of replacing it
    pub append: bool,
}

/// Element names used by the XML export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlOptions {
    pub root: String,
    pub row: String,
    pub column: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            separator: ";".to_string(),
            enclosure: "\"".to_string(),
            header: true,
        }
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            header: true,
            append: false,
        }
    }
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            root: "csv".to_string(),
            row: "row".to_string(),
            column: "column".to_string(),
        }
    }
}

fn single_ascii(key: &str, value: &str) -> Result<u8> {
    match value.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(TableError::InvalidConfig(format!(
            "{} must be a single ASCII character, got {:?}",
            key, value
        ))),
    }
}

impl Config {
    pub fn new(separator: char, enclosure: char, header: bool) -> Self {
        Self {
            separator: separator.to_string(),
            enclosure: enclosure.to_string(),
            header,
        }
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub fn with_enclosure(mut self, enclosure: char) -> Self {
        self.enclosure = enclosure.to_string();
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn validate(&self) -> Result<()> {
        single_ascii("separator", &self.separator)?;
        single_ascii("enclosure", &self.enclosure)?;
        Ok(())
    }

    pub fn separator_byte(&self) -> Result<u8> {
        single_ascii("separator", &self.separator)
    }

    pub fn enclosure_byte(&self) -> Result<u8> {
        single_ascii("enclosure", &self.enclosure)
    }

    /// Build from a JSON object of overrides.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let config: Config = serde_json::from_value(json.clone())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file. `.json` files are read as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading table configuration from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Default configuration as a commented TOML document.
    pub fn create_default_with_comments() -> String {
        r#"# rowset table configuration
#
# Every key is optional; missing keys use the values shown here.

# Field delimiter, a single ASCII character
separator = ";"

# Quote character around non-numeric fields, a single ASCII character
enclosure = "\""

# Whether the first record holds the column names.
# When false, columns are named by position: "0", "1", ...
header = true
"#
        .to_string()
    }
}
