use serde_json::Value as JsonValue;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::config::{SaveOptions, XmlOptions};
use crate::data::datatable::Table;
use crate::data::value::parse_numeric;

/// Wrap a field in the enclosure unless it reads as a number.
/// Embedded enclosure characters are doubled.
fn enclose_field(field: &str, numeric: bool, enclosure: &str) -> String {
    if numeric {
        field.to_string()
    } else {
        let doubled = format!("{}{}", enclosure, enclosure);
        format!(
            "{}{}{}",
            enclosure,
            field.replace(enclosure, &doubled),
            enclosure
        )
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// CDATA sections cannot contain `]]>`, so it is split across two sections.
fn cdata(value: &str) -> String {
    format!("<![CDATA[{}]]>", value.replace("]]>", "]]]]><![CDATA[>"))
}

impl Table {
    /// Export as delimited text using the table's separator and enclosure.
    /// Lines are joined by `\n` without a trailing newline.
    pub fn as_csv(&self, with_headers: bool) -> String {
        let separator = self.config().separator.as_str();
        let enclosure = self.config().enclosure.as_str();
        let mut lines = Vec::with_capacity(self.count_rows() + 1);

        if with_headers {
            let header: Vec<String> = self
                .columns()
                .into_iter()
                .map(|name| enclose_field(name, parse_numeric(name).is_some(), enclosure))
                .collect();
            lines.push(header.join(separator));
        }

        for row in self.rows() {
            let fields: Vec<String> = row
                .values()
                .iter()
                .map(|value| enclose_field(&value.as_text(), value.is_numeric(), enclosure))
                .collect();
            lines.push(fields.join(separator));
        }

        lines.join("\n")
    }

    fn json_rows(&self) -> JsonValue {
        JsonValue::Array(
            self.rows()
                .iter()
                .map(|row| JsonValue::Object(row.to_json()))
                .collect(),
        )
    }

    /// Export as a JSON array of objects, keys in column order.
    pub fn as_json(&self) -> String {
        self.json_rows().to_string()
    }

    pub fn as_json_pretty(&self) -> String {
        let rows = self.json_rows();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| rows.to_string())
    }

    /// Export as XML, one element per row and one per cell, with the column
    /// name as the `name` attribute and the value as CDATA.
    pub fn as_xml(&self, options: &XmlOptions) -> String {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<{}>\n",
            options.root
        );
        for row in self.rows() {
            xml.push_str(&format!("\t<{}>\n", options.row));
            for (name, value) in row.to_array() {
                xml.push_str(&format!(
                    "\t\t<{col} name=\"{}\">{}</{col}>\n",
                    escape_attribute(name),
                    cdata(&value.as_text()),
                    col = options.column
                ));
            }
            xml.push_str(&format!("\t</{}>\n", options.row));
        }
        xml.push_str(&format!("</{}>", options.root));
        xml
    }

    /// Write the CSV export plus a trailing newline to `path`.
    /// Failures are logged and reported as `false`.
    pub fn save_to(&self, path: impl AsRef<Path>, options: &SaveOptions) -> bool {
        let path = path.as_ref();
        let data = format!("{}\n", self.as_csv(options.header));

        let result = OpenOptions::new()
            .create(true)
            .write(true)
            .append(options.append)
            .truncate(!options.append)
            .open(path)
            .and_then(|mut file| file.write_all(data.as_bytes()));

        match result {
            Ok(()) => {
                info!(
                    "Saved {} rows to {} (append: {})",
                    self.count_rows(),
                    path.display(),
                    options.append
                );
                true
            }
            Err(e) => {
                warn!("Failed to save table to {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Save, then load the file back with this table's configuration.
    pub fn save_and_load(&self, path: impl AsRef<Path>, options: &SaveOptions) -> Option<Table> {
        let path = path.as_ref();
        if !self.save_to(path, options) {
            return None;
        }
        debug!("Reloading {}", path.display());
        match Table::from_file(path, self.config().clone()) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("Failed to reload {}: {}", path.display(), e);
                None
            }
        }
    }
}
