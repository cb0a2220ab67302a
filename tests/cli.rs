//! Integration test: run the binary against snapshot dumps on disk.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

const OLDER: &str = r#"{
    "session_id": "run-1",
    "captured_at": "2025-03-01T10:00:00Z",
    "tables": [{
        "name": "objects",
        "default_sort": [{ "column": "Size", "direction": "descending" }],
        "columns": [
            { "name": "Type", "type": "str", "values": ["Mesh", "Texture", "Mesh"] },
            { "name": "Label", "type": "str", "role": "key", "values": ["rock", "grass", "tree"] },
            { "name": "Size", "type": "u64", "role": "size", "values": [100, 400, 250] }
        ]
    }]
}"#;

const NEWER: &str = r#"{
    "session_id": "run-2",
    "captured_at": "2025-03-01T10:05:00Z",
    "tables": [{
        "name": "objects",
        "columns": [
            { "name": "Type", "type": "str", "values": ["Mesh", "Mesh", "Audio"] },
            { "name": "Label", "type": "str", "role": "key", "values": ["tree", "rock", "wind"] },
            { "name": "Size", "type": "u64", "role": "size", "values": [300, 100, 50] }
        ]
    }]
}"#;

fn write_dump(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("snapview_cli_tests");
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write dump");
    path
}

fn snapview(args: &[&str]) -> Output {
    let dir = std::env::temp_dir().join("snapview_cli_tests");
    Command::new(env!("CARGO_BIN_EXE_snapview"))
        .args(args)
        .env("SNAPVIEW_CONFIG", dir.join("no-such-config.toml"))
        .env("SNAPVIEW_LOG_FILE", dir.join("cli.log"))
        .output()
        .expect("Failed to execute binary")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "binary failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn binary_prints_version() {
    let out = stdout(&snapview(&["--version"]));
    assert!(out.contains("0.1.0"), "got: {out}");
}

#[test]
fn show_applies_the_default_sort() {
    let path = write_dump("show_default.json", OLDER);
    let out = stdout(&snapview(&[
        "show",
        path.to_str().expect("utf-8 path"),
        "--table",
        "objects",
        "--raw-sizes",
    ]));
    let labels: Vec<&str> = out
        .lines()
        .skip(2)
        .filter_map(|l| l.split_whitespace().nth(1))
        .collect();
    assert_eq!(labels, vec!["grass", "tree", "rock"]);
}

#[test]
fn show_groups_and_searches() {
    let path = write_dump("show_grouped.json", OLDER);
    let out = stdout(&snapview(&[
        "show",
        path.to_str().expect("utf-8 path"),
        "-t",
        "objects",
        "-g",
        "Type",
        "-m",
        "Label=o",
        "--expand-all",
        "--raw-sizes",
    ]));
    assert!(out.contains("▾ Mesh"), "got:\n{out}");
    assert!(!out.contains("Texture"), "got:\n{out}");
    assert!(out.contains("rock"), "got:\n{out}");
    assert!(!out.contains("tree"), "got:\n{out}");
}

#[test]
fn diff_reports_classes_and_totals() {
    let older = write_dump("diff_older.json", OLDER);
    let newer = write_dump("diff_newer.json", NEWER);
    // Argument order does not matter; capture times decide what is older.
    let out = stdout(&snapview(&[
        "diff",
        newer.to_str().expect("utf-8 path"),
        older.to_str().expect("utf-8 path"),
        "-t",
        "objects",
        "--raw-sizes",
    ]));
    assert!(out.contains("Older total: 750"), "got:\n{out}");
    assert!(out.contains("Newer total: 450"), "got:\n{out}");
    assert!(out.contains("New: 50"), "got:\n{out}");
    assert!(out.contains("Deleted: 400"), "got:\n{out}");
    assert!(out.contains("Growth: -300"), "got:\n{out}");
}

#[test]
fn unknown_table_fails() {
    let path = write_dump("unknown_table.json", OLDER);
    let output = snapview(&["show", path.to_str().expect("utf-8 path"), "-t", "nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope"));
}

#[test]
fn tables_lists_names() {
    let path = write_dump("tables.json", OLDER);
    let out = stdout(&snapview(&["tables", path.to_str().expect("utf-8 path")]));
    assert!(out.contains("objects: 3 rows, 3 columns"), "got:\n{out}");
}
