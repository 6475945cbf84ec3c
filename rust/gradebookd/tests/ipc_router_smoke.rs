mod test_support;

use serde_json::json;
use std::io::Write;
use test_support::{
    read_response, request, request_err, request_ok, spawn_sidecar, str_field, temp_dir,
};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("gradebook-router-smoke");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected.get("datasetCount").and_then(|v| v.as_u64()), Some(1));

    let table = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "tables.create",
        json!({ "name": "Smoke" }),
    );
    let table_id = str_field(&table, "tableId");
    let column = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "columns.create",
        json!({ "tableId": table_id, "name": "Quiz", "maxScore": 10 }),
    );
    let column_id = str_field(&column, "columnId");

    let calls = [
        ("datasets.list", json!({})),
        ("tables.list", json!({})),
        ("tables.get", json!({ "tableId": table_id })),
        ("students.create", json!({ "tableId": table_id, "name": "Ann" })),
        ("marks.set", json!({ "tableId": table_id, "row": 0, "columnId": column_id, "value": "7" })),
        ("marks.setExam", json!({ "tableId": table_id, "row": 0, "value": 30 })),
        ("marks.normalize", json!({ "value": "1/2", "max": 10 })),
        ("columns.update", json!({ "tableId": table_id, "columnId": column_id, "name": "Quiz 1" })),
        ("students.rename", json!({ "tableId": table_id, "row": 0, "name": "Anne" })),
        ("tables.clone", json!({ "sourceTableId": table_id, "name": "Smoke Copy" })),
        ("exchange.exportAll", json!({ "outPath": workspace.join("all.json").to_string_lossy() })),
        ("backup.exportBundle", json!({ "outPath": workspace.join("b.zip").to_string_lossy() })),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = format!("s{}", i);
        let resp = request(&mut stdin, &mut reader, &id, method, params);
        assert_eq!(
            resp.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            resp
        );
    }

    let code = request_err(&mut stdin, &mut reader, "99", "grades.explode", json!({}));
    assert_eq!(code, "not_implemented");
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn malformed_line_gets_bad_json_and_loop_continues() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let resp = read_response(&mut reader);
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert!(resp.get("id").map(|v| v.is_null()).unwrap_or(false));
    assert_eq!(
        resp.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_json")
    );

    let health = request_ok(&mut stdin, &mut reader, "after", "health", json!({}));
    assert!(health.get("version").is_some());
}

#[test]
fn stateful_methods_require_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    for (i, method) in ["datasets.list", "tables.list", "tables.create", "exchange.exportAll"]
        .into_iter()
        .enumerate()
    {
        let code = request_err(
            &mut stdin,
            &mut reader,
            &i.to_string(),
            method,
            json!({ "name": "X", "outPath": "/tmp/never.json" }),
        );
        assert_eq!(code, "no_workspace", "{}", method);
    }

    // Pure normalization works without any workspace.
    let preview = request_ok(
        &mut stdin,
        &mut reader,
        "n",
        "marks.normalize",
        json!({ "value": "50%", "max": 15 }),
    );
    assert_eq!(preview.get("mark").and_then(|v| v.as_i64()), Some(8));
}
