mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{request_err, request_ok, spawn_sidecar, str_field, temp_dir};

fn set_mark(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    table_id: &str,
    id: &str,
    column_id: &str,
    value: serde_json::Value,
) -> serde_json::Value {
    request_ok(
        stdin,
        reader,
        id,
        "marks.set",
        json!({ "tableId": table_id, "row": 0, "columnId": column_id, "value": value }),
    )
}

fn positions(table_get: &serde_json::Value) -> Vec<i64> {
    table_get
        .pointer("/table/students")
        .and_then(|v| v.as_array())
        .expect("students")
        .iter()
        .map(|s| s.get("position").and_then(|v| v.as_i64()).expect("position"))
        .collect()
}

#[test]
fn mark_entry_normalizes_and_recomputes_totals() {
    let workspace = temp_dir("gradebook-scoring");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let table_id = str_field(
        &request_ok(&mut stdin, &mut reader, "2", "tables.create", json!({ "name": "Math" })),
        "tableId",
    );
    let quiz = str_field(
        &request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "columns.create",
            json!({ "tableId": table_id, "name": "Quiz", "maxScore": 20 }),
        ),
        "columnId",
    );
    let test = str_field(
        &request_ok(
            &mut stdin,
            &mut reader,
            "4",
            "columns.create",
            json!({ "tableId": table_id, "name": "Test", "maxScore": 40 }),
        ),
        "columnId",
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.create",
        json!({ "tableId": table_id, "name": "Alice" }),
    );

    let r = set_mark(&mut stdin, &mut reader, &table_id, "6", &quiz, json!("3/4"));
    assert_eq!(r.get("mark").and_then(|v| v.as_i64()), Some(15));
    let r = set_mark(&mut stdin, &mut reader, &table_id, "7", &quiz, json!("abc"));
    assert_eq!(r.get("mark").and_then(|v| v.as_i64()), Some(0));
    let r = set_mark(&mut stdin, &mut reader, &table_id, "8", &quiz, json!("200"));
    assert_eq!(r.get("mark").and_then(|v| v.as_i64()), Some(20));

    // 20 + 40 = 60, capped at 50 for the continuous assessment total.
    let r = set_mark(&mut stdin, &mut reader, &table_id, "9", &test, json!(40));
    assert_eq!(r.pointer("/student/catTotal").and_then(|v| v.as_i64()), Some(50));

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "marks.setExam",
        json!({ "tableId": table_id, "row": 0, "value": "200" }),
    );
    assert_eq!(r.get("exam").and_then(|v| v.as_i64()), Some(50));
    assert_eq!(r.pointer("/student/total").and_then(|v| v.as_i64()), Some(100));
    assert_eq!(r.get("saved").and_then(|v| v.as_bool()), Some(true));

    // Lowering a column's max clamps stored marks.
    let r = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "columns.update",
        json!({ "tableId": table_id, "columnId": test, "maxScore": 10 }),
    );
    let student = r.pointer("/table/students/0").expect("student");
    assert_eq!(
        student.pointer(&format!("/catMarks/{}", test)).and_then(|v| v.as_i64()),
        Some(10)
    );
    assert_eq!(student.get("catTotal").and_then(|v| v.as_i64()), Some(30));
    assert_eq!(student.get("total").and_then(|v| v.as_i64()), Some(80));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn ranking_uses_competition_positions() {
    let workspace = temp_dir("gradebook-ranking");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let table_id = str_field(
        &request_ok(&mut stdin, &mut reader, "2", "tables.create", json!({ "name": "Bio" })),
        "tableId",
    );

    for (row, (name, exam)) in [("A", 20), ("B", 10), ("C", 20), ("D", 20)].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", row),
            "students.create",
            json!({ "tableId": table_id, "name": name }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("e{}", row),
            "marks.setExam",
            json!({ "tableId": table_id, "row": row, "value": exam }),
        );
    }

    let got = request_ok(&mut stdin, &mut reader, "3", "tables.get", json!({ "tableId": table_id }));
    assert_eq!(positions(&got), vec![1, 4, 1, 1]);
    let ranking: Vec<String> = got
        .get("ranking")
        .and_then(|v| v.as_array())
        .expect("ranking")
        .iter()
        .map(|r| r.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string())
        .collect();
    assert_eq!(ranking, vec!["A", "C", "D", "B"]);

    // Removing a tied student re-ranks the rest.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.delete",
        json!({ "tableId": table_id, "row": 0 }),
    );
    let got = request_ok(&mut stdin, &mut reader, "5", "tables.get", json!({ "tableId": table_id }));
    assert_eq!(positions(&got), vec![3, 1, 1]);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn invalid_edits_are_rejected() {
    let workspace = temp_dir("gradebook-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let table_id = str_field(
        &request_ok(&mut stdin, &mut reader, "2", "tables.create", json!({ "name": "Chem" })),
        "tableId",
    );

    let code = request_err(&mut stdin, &mut reader, "3", "tables.create", json!({ "name": "Chem" }));
    assert_eq!(code, "validation_failed");
    let code = request_err(&mut stdin, &mut reader, "4", "tables.create", json!({ "name": "  " }));
    assert_eq!(code, "validation_failed");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "columns.create",
        json!({ "tableId": table_id, "name": "Lab", "maxScore": 0 }),
    );
    assert_eq!(code, "validation_failed");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "marks.setExam",
        json!({ "tableId": table_id, "row": 3, "value": 10 }),
    );
    assert_eq!(code, "not_found");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "students.rename",
        json!({ "tableId": table_id, "row": -1, "name": "X" }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(&mut stdin, &mut reader, "8", "tables.get", json!({ "tableId": "table-99" }));
    assert_eq!(code, "not_found");

    let _ = std::fs::remove_dir_all(workspace);
}
