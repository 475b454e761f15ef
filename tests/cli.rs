mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

use common::{TestWorkspace, fixture_path, path_arg};

fn csv_unify() -> Command {
    Command::cargo_bin("csv-unify").expect("binary exists")
}

#[test]
fn unify_aligns_inputs_by_column_name() {
    let a = fixture_path("orders_a.csv");
    let b = fixture_path("orders_b.csv");
    let assert = csv_unify()
        .args(["unify", "-i", path_arg(&a), "-i", path_arg(&b)])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8");
    let lines: Vec<&str> = stdout.lines().map(|line| line.trim_end_matches('\r')).collect();
    assert_eq!(
        lines,
        vec![
            "key,order_id,customer,amount,ordered_on,priority",
            "Row0,A-1,Alice,42.5,2024-01-01,",
            "Row1,A-2,Bob,13,2024-01-03,",
            "Row2,B-1,Carol,7,,true",
            "Row3,B-2,Dave,,,false",
        ]
    );
}

#[test]
fn unify_selects_columns_and_extracts_prefixed_keys() {
    let workspace = TestWorkspace::new();
    let first = workspace.write_csv("first.csv", &["id,name,score", "7,ann,1", "8,bo,2"]);
    let second = workspace.write_csv("second.csv", &["id,score,extra", "7,3,x"]);
    let output = workspace.file("out.csv");
    csv_unify()
        .args([
            "unify",
            "-i",
            path_arg(&first),
            "-i",
            path_arg(&second),
            "--row-id-column",
            "0",
            "--prefix-source",
            "-C",
            "score,name",
            "-o",
            path_arg(&output),
        ])
        .assert()
        .success();
    let written = workspace.read("out.csv");
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(
        lines,
        vec!["key,score,name", "File_0_7,1,ann", "File_0_8,2,bo", "File_1_7,3,"]
    );
}

#[test]
fn duplicate_row_keys_fail() {
    let workspace = TestWorkspace::new();
    let first = workspace.write_csv("first.csv", &["id,v", "1,a"]);
    let second = workspace.write_csv("second.csv", &["id,v", "1,b"]);
    csv_unify()
        .args([
            "unify",
            "-i",
            path_arg(&first),
            "-i",
            path_arg(&second),
            "--row-id-column",
            "0",
        ])
        .assert()
        .failure()
        .stderr(contains("Row key '1' is not unique"));
}

#[test]
fn short_rows_are_rejected_unless_allowed() {
    let workspace = TestWorkspace::new();
    let ragged = workspace.write_csv("ragged.csv", &["a,b", "1,2", "3"]);
    csv_unify()
        .args(["unify", "-i", path_arg(&ragged)])
        .assert()
        .failure()
        .stderr(contains("previous row had 2"));

    csv_unify()
        .args(["unify", "-i", path_arg(&ragged), "--allow-short-rows"])
        .assert()
        .success()
        .stdout(contains("Row1,3,"));
}

#[test]
fn headerless_inputs_get_positional_names() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_csv("plain.csv", &["1,x", "2,y"]);
    csv_unify()
        .args(["unify", "-i", path_arg(&input), "--no-header"])
        .assert()
        .success()
        .stdout(contains("key,Column0,Column1").and(contains("Row1,2,y")));
}

#[test]
fn header_row_after_a_preamble() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_csv("preamble.csv", &["exported by tool", "# second line", "id;label", "5;five"]);
    csv_unify()
        .args([
            "unify",
            "-i",
            path_arg(&input),
            "--delimiter",
            ";",
            "--header-row",
            "2",
            "--skip-rows",
            "2",
        ])
        .assert()
        .success()
        .stdout(contains("key,id,label").and(contains("Row0,5,five")));
}

#[test]
fn probe_reports_merged_types_as_json() {
    let a = fixture_path("orders_a.csv");
    let b = fixture_path("orders_b.csv");
    let assert = csv_unify()
        .args(["probe", "-i", path_arg(&a), "-i", path_arg(&b), "--json"])
        .assert()
        .success();
    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).expect("json report");
    let columns = report["columns"].as_array().expect("columns");
    let summary: Vec<(String, String, u64)> = columns
        .iter()
        .map(|column| {
            (
                column["name"].as_str().unwrap().to_string(),
                column["column_type"].as_str().unwrap().to_string(),
                column["present_in"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("order_id".to_string(), "string".to_string(), 2),
            ("customer".to_string(), "string".to_string(), 2),
            ("amount".to_string(), "float".to_string(), 2),
            ("ordered_on".to_string(), "date".to_string(), 1),
            ("priority".to_string(), "boolean".to_string(), 1),
        ]
    );
}

#[test]
fn saved_transformation_drives_later_runs() {
    let workspace = TestWorkspace::new();
    let january = workspace.write_csv("jan.csv", &["id,total", "1,10", "2,20"]);
    let february = workspace.write_csv("feb.csv", &["id,note,total", "3,late,x"]);
    let transformation = workspace.file("t.yaml");
    csv_unify()
        .args([
            "probe",
            "-i",
            path_arg(&january),
            "--transformation",
            path_arg(&transformation),
        ])
        .assert()
        .success()
        .stdout(contains("total").and(contains("integer")));

    let saved = workspace.read("t.yaml");
    assert!(saved.contains("format_version: 1"));
    std::fs::write(
        &transformation,
        saved.replace("output_name: total", "output_name: amount"),
    )
    .expect("edit transformation");

    csv_unify()
        .args([
            "unify",
            "-i",
            path_arg(&february),
            "--transformation",
            path_arg(&transformation),
        ])
        .assert()
        .success()
        .stdout(contains("key,id,amount,note").and(contains("Row0,3,x,late")));

    csv_unify()
        .args([
            "unify",
            "-i",
            path_arg(&february),
            "--transformation",
            path_arg(&transformation),
            "--enforce-types",
        ])
        .assert()
        .failure()
        .stderr(contains("Row Row0 column 'amount'"));
}

#[test]
fn preview_shows_types_in_headers() {
    let a = fixture_path("orders_a.csv");
    csv_unify()
        .args(["preview", "-i", path_arg(&a), "--rows", "1"])
        .assert()
        .success()
        .stdout(
            contains("amount (float)")
                .and(contains("Row0"))
                .and(contains("Row1").not()),
        );
}

#[test]
fn reads_stdin_as_an_input() {
    csv_unify()
        .args(["unify", "-i", "-"])
        .write_stdin("n,flag\n1,yes\n")
        .assert()
        .success()
        .stdout(contains("Row0,1,true"));
}

#[test]
fn unknown_selected_column_is_reported() {
    let a = fixture_path("orders_a.csv");
    csv_unify()
        .args(["unify", "-i", path_arg(&a), "-C", "missing"])
        .assert()
        .failure()
        .stderr(contains("Unknown column 'missing'"));
}
