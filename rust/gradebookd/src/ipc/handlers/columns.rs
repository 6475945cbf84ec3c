use crate::ipc::helpers::{
    param_i64, param_opt_i64, param_opt_str, param_str, require_workspace, respond, to_json,
    with_saved, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn columns_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    let name = param_str(req, "name")?;
    let max_score = param_i64(req, "maxScore")?;

    let table = require_workspace(state)?.current_mut()?.table_mut(table_id)?;
    let column_id = table.add_cat_column(name, max_score)?;
    let columns = to_json(&table.cat_columns)?;
    Ok(with_saved(
        state,
        json!({ "columnId": column_id, "catColumns": columns }),
    ))
}

fn columns_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    let column_id = param_str(req, "columnId")?;
    let name = param_opt_str(req, "name")?;
    let max_score = param_opt_i64(req, "maxScore")?;

    let table = require_workspace(state)?.current_mut()?.table_mut(table_id)?;
    table.edit_cat_column(column_id, name, max_score)?;
    let table = to_json(&*table)?;
    Ok(with_saved(state, json!({ "table": table })))
}

fn columns_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    let column_id = param_str(req, "columnId")?;

    let table = require_workspace(state)?.current_mut()?.table_mut(table_id)?;
    table.delete_cat_column(column_id)?;
    let table = to_json(&*table)?;
    Ok(with_saved(state, json!({ "deleted": column_id, "table": table })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "columns.create" => columns_create(state, req),
        "columns.update" => columns_update(state, req),
        "columns.delete" => columns_delete(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
