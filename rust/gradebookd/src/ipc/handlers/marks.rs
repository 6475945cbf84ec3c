use crate::calc::normalize_mark;
use crate::ipc::helpers::{
    param_i64, param_mark_input, param_row, param_str, require_workspace, respond, to_json,
    with_saved, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn marks_set(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    let row = param_row(req)?;
    let column_id = param_str(req, "columnId")?;
    let input = param_mark_input(req, "value")?;

    let table = require_workspace(state)?.current_mut()?.table_mut(table_id)?;
    let mark = table.set_cat_mark(row, column_id, &input)?;
    let student = to_json(table.student(row)?)?;
    Ok(with_saved(state, json!({ "mark": mark, "student": student })))
}

fn marks_set_exam(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    let row = param_row(req)?;
    let input = param_mark_input(req, "value")?;

    let table = require_workspace(state)?.current_mut()?.table_mut(table_id)?;
    let exam = table.set_exam(row, &input)?;
    let student = to_json(table.student(row)?)?;
    Ok(with_saved(state, json!({ "exam": exam, "student": student })))
}

/// Preview of how an input would be stored; touches no state.
fn marks_normalize(_state: &mut AppState, req: &Request) -> HandlerResult {
    let input = param_mark_input(req, "value")?;
    let max = param_i64(req, "max")?;
    Ok(json!({ "mark": normalize_mark(&input, max) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "marks.set" => marks_set(state, req),
        "marks.setExam" => marks_set_exam(state, req),
        "marks.normalize" => marks_normalize(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
