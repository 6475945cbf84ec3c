use crate::ipc::helpers::{
    param_row, param_str, require_workspace, respond, to_json, with_saved, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn students_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    let name = param_str(req, "name")?;

    let table = require_workspace(state)?.current_mut()?.table_mut(table_id)?;
    let row = table.add_student(name)?;
    let student = to_json(table.student(row)?)?;
    Ok(with_saved(state, json!({ "row": row, "student": student })))
}

fn students_rename(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    let row = param_row(req)?;
    let name = param_str(req, "name")?;

    require_workspace(state)?
        .current_mut()?
        .table_mut(table_id)?
        .rename_student(row, name)?;
    Ok(with_saved(state, json!({ "row": row })))
}

fn students_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    let row = param_row(req)?;

    let table = require_workspace(state)?.current_mut()?.table_mut(table_id)?;
    let removed = table.delete_student(row)?;
    Ok(with_saved(
        state,
        json!({ "row": row, "name": removed.name }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.create" => students_create(state, req),
        "students.rename" => students_rename(state, req),
        "students.delete" => students_delete(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
