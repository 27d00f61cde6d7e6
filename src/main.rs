use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use rowset::logging::init_tracing;
use rowset::{Config, Query, SortDirection, Table, XmlOptions};

mod table_display;

use table_display::render_rows;

#[derive(Parser, Debug)]
#[command(
    name = "rowset",
    version,
    about = "Filter, group, sort and re-export delimited text files",
    after_help = r#"EXAMPLES
  $ rowset people.csv --filter '[["age", ">=", 18]]' --order age:DESC_NUM --format table
  $ rowset people.csv --group city --limit 10 --format json
  $ rowset data.txt --separator , --no-header --limit 5 --offset 20
  $ rowset --config rowset.json --separator '|' --print-config > rowset.toml"#
)]
struct Cli {
    #[arg(
        help = "Delimited text file to load",
        value_hint = ValueHint::FilePath,
        required_unless_present = "print_config"
    )]
    input: Option<PathBuf>,

    #[arg(long, help = "Field delimiter (default ';')")]
    separator: Option<char>,

    #[arg(long, help = "Quote character (default '\"')")]
    enclosure: Option<char>,

    #[arg(long, help = "Treat the first record as data; columns are named 0, 1, ...")]
    no_header: bool,

    #[arg(
        long,
        help = "Settings file with separator/enclosure/header (TOML, or JSON with a .json extension)",
        value_hint = ValueHint::FilePath
    )]
    config: Option<PathBuf>,

    #[arg(long, help = "Print the effective settings as TOML and exit")]
    print_config: bool,

    #[arg(long, help = r#"JSON array of rule triples, e.g. '[["age", ">", 30]]'"#)]
    filter: Option<String>,

    #[arg(long = "group", help = "Keep the first row per distinct value (repeatable)")]
    groups: Vec<String>,

    #[arg(
        long = "order",
        value_parser = parse_order,
        help = "Sort key COLUMN:ASC|DESC|ASC_NUM|DESC_NUM (repeatable)"
    )]
    orders: Vec<(String, SortDirection)>,

    #[arg(long, help = "Maximum number of rows to return")]
    limit: Option<usize>,

    #[arg(long, requires = "limit", help = "Rows to skip before the limit applies")]
    offset: Option<usize>,

    #[arg(long, value_enum, default_value = "csv", help = "Output format")]
    format: OutputFormat,

    #[arg(long, help = "Write the result to a file instead of stdout", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity (-v, -vv, -vvv)")]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
    Xml,
    Table,
}

fn parse_order(arg: &str) -> std::result::Result<(String, SortDirection), String> {
    let (column, direction) = match arg.rsplit_once(':') {
        Some((column, direction)) => (column, direction),
        None => (arg, "ASC"),
    };
    if column.is_empty() {
        return Err(format!("missing column name in '{}'", arg));
    }
    let direction = direction.parse::<SortDirection>().map_err(|e| e.to_string())?;
    Ok((column.to_string(), direction))
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(separator) = cli.separator {
        config = config.with_separator(separator);
    }
    if let Some(enclosure) = cli.enclosure {
        config = config.with_enclosure(enclosure);
    }
    if cli.no_header {
        config = config.with_header(false);
    }
    config.validate().context("Invalid table configuration")?;
    Ok(config)
}

fn build_query<'t>(cli: &Cli, table: &'t Table) -> Result<Query<'t>> {
    let mut query = table.query();
    if let Some(filter) = &cli.filter {
        query = query
            .filter_json(filter)
            .with_context(|| format!("Invalid filter rules: {}", filter))?;
    }
    if !cli.groups.is_empty() {
        query = query.group_by(cli.groups.iter().cloned());
    }
    if !cli.orders.is_empty() {
        query = query.order_by(cli.orders.iter().cloned())?;
    }
    // The engine takes (start, Some(count)) when an offset is given
    if let Some(limit) = cli.limit {
        query = match cli.offset {
            Some(offset) => query.limit(offset, Some(limit)),
            None => query.limit(limit, None),
        };
    }
    Ok(query)
}

fn render(cli: &Cli, query: &Query<'_>) -> Result<String> {
    let output = match cli.format {
        OutputFormat::Table => render_rows(query.table(), &query.get()),
        format => {
            let result = query.to_table()?;
            match format {
                OutputFormat::Json => result.as_json_pretty(),
                OutputFormat::Xml => result.as_xml(&XmlOptions::default()),
                _ => result.as_csv(result.config().header),
            }
        }
    };
    Ok(output)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!("Parsed arguments: {:?}", cli);

    let config = build_config(&cli)?;
    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let input = cli.input.as_deref().context("No input file given")?;
    let table = Table::from_file(input, config)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let query = build_query(&cli, &table)?;
    let output = render(&cli, &query)?;

    match &cli.output {
        Some(path) => {
            fs::write(path, format!("{}\n", output))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} rows to {}", query.count(), path.display());
        }
        None => println!("{}", output),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order() {
        assert_eq!(
            parse_order("age:desc_num").unwrap(),
            ("age".to_string(), SortDirection::DescNumeric)
        );
        assert_eq!(
            parse_order("name").unwrap(),
            ("name".to_string(), SortDirection::Asc)
        );
        assert!(parse_order("age:sideways").is_err());
        assert!(parse_order(":ASC").is_err());
    }

    #[test]
    fn test_limit_and_offset_map_onto_engine() {
        let mut table = Table::default();
        table.append_column("n", None).unwrap();
        for i in 0..5 {
            table.append_row(vec![i.to_string()]);
        }

        let cli = Cli::parse_from(["rowset", "in.csv", "--limit", "2", "--offset", "1"]);
        let rows = build_query(&cli, &table).unwrap().get();
        let values: Vec<String> = rows.iter().map(|r| r.values()[0].to_string()).collect();
        assert_eq!(values, vec!["1", "2"]);
    }

    #[test]
    fn test_config_overrides() {
        let cli = Cli::parse_from(["rowset", "in.csv", "--separator", ",", "--no-header"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.separator, ",");
        assert!(!config.header);
    }

    #[test]
    fn test_print_config_merges_file_and_flags() {
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        fs::write(file.path(), r#"{"enclosure": "'"}"#).unwrap();
        let config_path = file.path().to_str().unwrap();

        let cli = Cli::parse_from([
            "rowset",
            "--config",
            config_path,
            "--separator",
            "|",
            "--print-config",
        ]);
        assert!(cli.input.is_none());
        let text = build_config(&cli).unwrap().to_toml_string().unwrap();
        assert_eq!(
            Config::from_toml_str(&text).unwrap(),
            Config::new('|', '\'', true)
        );

        assert!(Cli::try_parse_from(["rowset", "--separator", "|"]).is_err());
    }
}
