use crate::ipc::helpers::{
    param_str, require_workspace, respond, with_saved, HandlerErr, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

fn datasets_list(state: &mut AppState, _req: &Request) -> HandlerResult {
    let data = require_workspace(state)?;
    let datasets: Vec<serde_json::Value> = data
        .result_datasets
        .iter()
        .map(|d| {
            json!({
                "id": d.id,
                "name": d.name,
                "tableCount": d.tables.len(),
                "studentCount": d.tables.iter().map(|t| t.students.len()).sum::<usize>(),
                "isCurrent": d.id == data.current_dataset_id,
            })
        })
        .collect();
    Ok(json!({
        "datasets": datasets,
        "currentDatasetId": data.current_dataset_id,
    }))
}

fn datasets_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let name = param_str(req, "name")?;
    let select = req
        .params
        .get("select")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    let data = require_workspace(state)?;
    let id = data.create_dataset(name)?;
    if select {
        data.select_dataset(&id)?;
    }
    info!(dataset_id = %id, "dataset created");
    Ok(with_saved(
        state,
        json!({ "datasetId": id, "currentDatasetId": state.data.current_dataset_id }),
    ))
}

fn datasets_rename(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = param_str(req, "datasetId")?;
    let name = param_str(req, "name")?;
    require_workspace(state)?.rename_dataset(id, name)?;
    Ok(with_saved(state, json!({ "datasetId": id })))
}

fn datasets_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = param_str(req, "datasetId")?;
    require_workspace(state)?.delete_dataset(id)?;
    info!(dataset_id = %id, "dataset deleted");
    Ok(with_saved(
        state,
        json!({ "deleted": id, "currentDatasetId": state.data.current_dataset_id }),
    ))
}

fn datasets_select(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = param_str(req, "datasetId")?;
    let data = require_workspace(state)?;
    data.select_dataset(id).map_err(|e| {
        HandlerErr::from(e).with_details(json!({ "datasetId": id }))
    })?;
    Ok(with_saved(state, json!({ "currentDatasetId": id })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "datasets.list" => datasets_list(state, req),
        "datasets.create" => datasets_create(state, req),
        "datasets.rename" => datasets_rename(state, req),
        "datasets.delete" => datasets_delete(state, req),
        "datasets.select" => datasets_select(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
