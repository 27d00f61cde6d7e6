/// Delimited text to Table loader
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::config::config::Config;
use crate::data::datatable::Table;
use crate::data::row::RowData;
use crate::error::Result;

impl Table {
    /// Load a table from a delimited text file.
    pub fn from_file(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading {} into a table", path.display());
        let file = File::open(path)?;
        let table = Self::from_reader(file, config)?;
        info!(
            "Loaded {}: {} rows, {} columns",
            path.display(),
            table.count_rows(),
            table.count_columns()
        );
        Ok(table)
    }

    /// Parse delimited text held in memory.
    pub fn parse(text: &str, config: Config) -> Result<Self> {
        Self::from_reader(text.as_bytes(), config)
    }

    /// Read records with the configured separator and enclosure. Empty lines
    /// are skipped and records may differ in length.
    pub fn from_reader<R: Read>(reader: R, config: Config) -> Result<Self> {
        config.validate()?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(config.separator_byte()?)
            .quote(config.enclosure_byte()?)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let header = config.header;
        let mut table = Table::new(config);
        let mut records = reader.records();

        if header {
            if let Some(first) = records.next() {
                for name in first?.iter() {
                    table.append_column(name, None)?;
                }
            }
            for record in records {
                let record = record?;
                table.append_row(record.iter().collect::<Vec<_>>());
            }
        } else {
            // Columns are named by position, wide enough for the widest record
            let rows = records
                .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect::<Vec<_>>()))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            for position in 0..width {
                table.append_column(position.to_string(), None)?;
            }
            for values in rows {
                table.append_row(RowData::from(values));
            }
        }

        debug!(
            "Parsed {} records into table {}",
            table.count_rows(),
            table.id()
        );
        Ok(table)
    }
}
