use rowset::{Config, SaveOptions, Table, Value};
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_then_save_reproduces_input() {
    let input = "\"id\";\"name\";\"city\"\n1;\"Alice\";\"Paris\"\n2;\"Bob\";\"Oslo\"\n";
    let source = write_temp(input);
    let table = Table::from_file(source.path(), Config::default()).unwrap();

    let target = NamedTempFile::new().unwrap();
    assert!(table.save_to(target.path(), &SaveOptions::default()));
    assert_eq!(fs::read_to_string(target.path()).unwrap(), input);
}

#[test]
fn test_unquoted_input_is_normalized() {
    let source = write_temp("id,name\n1,Alice\n");
    let config = Config::default().with_separator(',');
    let table = Table::from_file(source.path(), config).unwrap();

    assert_eq!(table.as_csv(true), "\"id\",\"name\"\n1,\"Alice\"");
}

#[test]
fn test_padding_and_truncation_from_file() {
    let source = write_temp("a;b;c\n1\n1;2;3;4;5\n");
    let table = Table::from_file(source.path(), Config::default()).unwrap();

    assert_eq!(
        table.row(0).unwrap().values(),
        &[Value::text("1"), Value::empty(), Value::empty()]
    );
    assert_eq!(table.row(1).unwrap().values().len(), 3);
}

#[test]
fn test_modified_table_survives_save_and_load() {
    let source = write_temp("name;age\nAlice;30\nBob;25\n");
    let mut table = Table::from_file(source.path(), Config::default()).unwrap();

    table.append_column("city", Some(Value::text("Paris"))).unwrap();
    table.remove_column("age").unwrap();
    table.remove_row(0, true).unwrap();
    table.append_row(vec!["Carol", "Rome"]);

    let target = NamedTempFile::new().unwrap();
    let reloaded = table
        .save_and_load(target.path(), &SaveOptions::default())
        .unwrap();

    assert_eq!(reloaded.columns(), vec!["name", "city"]);
    assert_eq!(reloaded.count_rows(), 2);
    assert_eq!(
        reloaded.column_values("city").unwrap(),
        vec![&Value::text("Paris"), &Value::text("Rome")]
    );
}

#[test]
fn test_query_result_export() {
    let source = write_temp("name;age\nAlice;30\nBob;17\nCarol;45\n");
    let table = Table::from_file(source.path(), Config::default()).unwrap();

    let adults = table
        .query()
        .filter_json(r#"[["age", ">=", 18]]"#)
        .unwrap()
        .order_by([("age", "DESC_NUM")])
        .unwrap()
        .to_table()
        .unwrap();

    assert_eq!(
        adults.as_json(),
        r#"[{"name":"Carol","age":"45"},{"name":"Alice","age":"30"}]"#
    );
}

#[test]
fn test_config_file_drives_loading() {
    let config_file = write_temp("separator = \"|\"\nheader = false\n");
    let config = Config::load(config_file.path()).unwrap();

    let source = write_temp("x|y\nz\n");
    let table = Table::from_file(source.path(), config).unwrap();
    assert_eq!(table.columns(), vec!["0", "1"]);
    assert_eq!(table.count_rows(), 2);
}
