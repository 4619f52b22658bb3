// CLI integration tests for extract, tables, rows, and exit codes.
use std::path::Path;
use std::process::Command;

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_bcp2pg");
    let mut command = Command::new(exe);
    command.env_remove("RUST_LOG");
    command
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn json_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(parse_json)
        .collect()
}

const MODEL: &str = r#"{"tables": [
    {"schema": "dbo", "name": "people",
     "columns": [{"name": "id", "type": "int", "nullable": false},
                 {"name": "nick", "type": "varchar", "length": 20}]},
    {"schema": "dbo", "name": "Broken",
     "columns": [{"name": "id", "type": "int", "nullable": false},
                 {"name": "note", "type": "varchar"}]}
]}"#;

fn person(id: i32, nick: Option<&str>) -> Vec<u8> {
    let mut bytes = id.to_le_bytes().to_vec();
    match nick {
        Some(nick) => {
            bytes.extend_from_slice(&(nick.len() as u16).to_le_bytes());
            bytes.extend_from_slice(nick.as_bytes());
        }
        None => bytes.extend_from_slice(&[0xFF, 0xFF]),
    }
    bytes
}

/// Writes a model plus data for `dbo.people` (two files) and `dbo.Broken`
/// (truncated on its second row).
fn fixture(root: &Path) -> std::path::PathBuf {
    let model = root.join("model.json");
    std::fs::write(&model, MODEL).expect("model");

    let people = root.join("Data").join("dbo.people");
    std::fs::create_dir_all(&people).expect("mkdir");
    let mut bytes = person(1, Some("tab\there"));
    bytes.extend(person(2, None));
    bytes.extend(person(3, Some("line\nbreak")));
    let (first, second) = bytes.split_at(bytes.len() - 5);
    std::fs::write(people.join("TableData-000-00000.BCP"), first).expect("write");
    std::fs::write(people.join("TableData-001-00000.BCP"), second).expect("write");

    let broken = root.join("Data").join("dbo.Broken");
    std::fs::create_dir_all(&broken).expect("mkdir");
    let mut bytes = person(42, Some("ab"));
    bytes.extend_from_slice(&7i32.to_le_bytes());
    std::fs::write(broken.join("TableData-000-00000.BCP"), bytes).expect("write");

    model
}

#[test]
fn extract_writes_copy_files_and_reports_failures() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = fixture(temp.path());
    let out = temp.path().join("out");

    let extract = cmd()
        .args([
            "extract",
            "--model",
            model.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--workers",
            "2",
            "--json",
        ])
        .output()
        .expect("extract");
    assert_eq!(extract.status.code().unwrap(), 5);

    let summary = parse_json(std::str::from_utf8(&extract.stdout).expect("utf8").trim());
    assert_eq!(summary["failed"], 1);
    let tables = summary["tables"].as_array().expect("tables");
    assert_eq!(tables[0]["table"], "dbo.people");
    assert_eq!(tables[0]["rows"], 3);
    assert_eq!(tables[0]["status"], "ok");
    assert_eq!(tables[1]["table"], "dbo.Broken");
    assert_eq!(tables[1]["rows"], 1);
    assert_eq!(tables[1]["status"], "failed");
    assert_eq!(tables[1]["error"]["kind"], "TruncatedRead");

    let people = std::fs::read_to_string(out.join("dbo.people.dump")).expect("people dump");
    assert_eq!(
        people,
        "COPY dbo.people (id, nick) FROM stdin;\n\
         1\ttab\\there\n\
         2\t\\N\n\
         3\tline\\nbreak\n\
         \\.\n\n"
    );
    let broken = std::fs::read_to_string(out.join("dbo.Broken.dump")).expect("broken dump");
    assert_eq!(
        broken,
        "COPY dbo.\"Broken\" (id, note) FROM stdin;\n42\tab\n\\.\n\n"
    );

    let notices = json_lines(&extract.stderr);
    let notice = notices
        .iter()
        .find_map(|value| value.get("notice"))
        .expect("notice");
    assert_eq!(notice["kind"], "table_failed");
    assert_eq!(notice["table"], "dbo.Broken");
    assert_eq!(notice["details"]["row"], 2);
    assert_eq!(notice["details"]["column"], "note");
    assert_eq!(notice["details"]["kind"], "TruncatedRead");
}

#[test]
fn extract_honors_table_selection_and_limit() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = fixture(temp.path());
    let out = temp.path().join("out");
    let list = temp.path().join("tables.txt");
    std::fs::write(&list, "# just people\n\npeople\n").expect("list");

    let extract = cmd()
        .args([
            "extract",
            "--model",
            model.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--tables-file",
            list.to_str().unwrap(),
            "--limit",
            "2",
            "--json",
        ])
        .output()
        .expect("extract");
    assert!(extract.status.success());

    let summary = parse_json(std::str::from_utf8(&extract.stdout).expect("utf8").trim());
    let tables = summary["tables"].as_array().expect("tables");
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0]["rows"], 2);
    assert!(!out.join("dbo.Broken.dump").exists());
}

#[test]
fn tables_lists_model() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = fixture(temp.path());

    let tables = cmd()
        .args(["tables", "--model", model.to_str().unwrap(), "--json"])
        .output()
        .expect("tables");
    assert!(tables.status.success());
    let value = parse_json(std::str::from_utf8(&tables.stdout).expect("utf8").trim());
    let list = value["tables"].as_array().expect("tables");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["name"], "dbo.people");
    assert_eq!(list[0]["columns"][1]["type"], "varchar");
    assert_eq!(list[0]["columns"][0]["nullable"], false);
}

#[test]
fn rows_prints_json_lines() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = fixture(temp.path());

    let rows = cmd()
        .args(["rows", "--model", model.to_str().unwrap(), "dbo.people"])
        .output()
        .expect("rows");
    assert!(rows.status.success());
    let lines = json_lines(&rows.stdout);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["row"], 1);
    assert_eq!(lines[0]["values"]["nick"], "tab\there");
    assert!(lines[1]["values"]["nick"].is_null());
    assert_eq!(lines[2]["values"]["id"], "3");
}

#[test]
fn rows_reports_truncation_after_partial_output() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = fixture(temp.path());

    let rows = cmd()
        .args(["rows", "--model", model.to_str().unwrap(), "Broken"])
        .output()
        .expect("rows");
    assert_eq!(rows.status.code().unwrap(), 5);
    assert_eq!(json_lines(&rows.stdout).len(), 1);
    let errors = json_lines(&rows.stderr);
    let error = errors
        .iter()
        .find_map(|value| value.get("error"))
        .expect("error");
    assert_eq!(error["kind"], "TruncatedRead");
    assert_eq!(error["column"], "note");
}

#[test]
fn not_found_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = fixture(temp.path());

    let missing_model = cmd()
        .args([
            "tables",
            "--model",
            temp.path().join("nope.json").to_str().unwrap(),
        ])
        .output()
        .expect("tables");
    assert_eq!(missing_model.status.code().unwrap(), 3);

    let missing_table = cmd()
        .args(["rows", "--model", model.to_str().unwrap(), "dbo.nope"])
        .output()
        .expect("rows");
    assert_eq!(missing_table.status.code().unwrap(), 3);
}

#[test]
fn usage_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = fixture(temp.path());

    let zero_workers = cmd()
        .args([
            "extract",
            "--model",
            model.to_str().unwrap(),
            "--output",
            temp.path().join("out").to_str().unwrap(),
            "--workers",
            "0",
        ])
        .output()
        .expect("extract");
    assert_eq!(zero_workers.status.code().unwrap(), 2);
    let errors = json_lines(&zero_workers.stderr);
    assert_eq!(errors[0]["error"]["kind"], "Usage");
}

#[test]
fn unknown_type_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = temp.path().join("model.json");
    std::fs::write(
        &model,
        r#"{"tables": [{"schema": "dbo", "name": "t", "columns": [{"name": "x", "type": "interval"}]}]}"#,
    )
    .expect("model");

    let tables = cmd()
        .args(["tables", "--model", model.to_str().unwrap()])
        .output()
        .expect("tables");
    assert_eq!(tables.status.code().unwrap(), 6);
}
