use crate::ipc::helpers::{
    param_str, require_workspace, respond, to_json, with_saved, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn tables_list(state: &mut AppState, _req: &Request) -> HandlerResult {
    let dataset = require_workspace(state)?.current()?;
    let tables: Vec<serde_json::Value> = dataset
        .tables
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "name": t.name,
                "studentCount": t.students.len(),
                "columnCount": t.cat_columns.len(),
            })
        })
        .collect();
    Ok(json!({ "datasetId": dataset.id, "tables": tables }))
}

fn tables_get(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    let table = require_workspace(state)?.current()?.table(table_id)?;

    // Ranking view: roster rows ordered by position, ties in roster order.
    let mut ranking: Vec<(usize, i64)> = table
        .students
        .iter()
        .enumerate()
        .map(|(row, s)| (row, s.position))
        .collect();
    ranking.sort_by_key(|&(_, position)| position);
    let ranking: Vec<serde_json::Value> = ranking
        .into_iter()
        .map(|(row, position)| {
            json!({
                "row": row,
                "name": table.students[row].name,
                "total": table.students[row].total,
                "position": position,
            })
        })
        .collect();

    Ok(json!({ "table": to_json(table)?, "ranking": ranking }))
}

fn tables_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let name = param_str(req, "name")?;
    let table_id = require_workspace(state)?.current_mut()?.add_table(name)?;
    Ok(with_saved(state, json!({ "tableId": table_id })))
}

fn tables_clone(state: &mut AppState, req: &Request) -> HandlerResult {
    let source_id = param_str(req, "sourceTableId")?;
    let name = param_str(req, "name")?;
    let table_id = require_workspace(state)?
        .current_mut()?
        .clone_table_names(source_id, name)?;
    Ok(with_saved(state, json!({ "tableId": table_id })))
}

fn tables_rename(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    let name = param_str(req, "name")?;
    require_workspace(state)?
        .current_mut()?
        .rename_table(table_id, name)?;
    Ok(with_saved(state, json!({ "tableId": table_id })))
}

fn tables_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let table_id = param_str(req, "tableId")?;
    require_workspace(state)?
        .current_mut()?
        .delete_table(table_id)?;
    Ok(with_saved(state, json!({ "deleted": table_id })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "tables.list" => tables_list(state, req),
        "tables.get" => tables_get(state, req),
        "tables.create" => tables_create(state, req),
        "tables.clone" => tables_clone(state, req),
        "tables.rename" => tables_rename(state, req),
        "tables.delete" => tables_delete(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
