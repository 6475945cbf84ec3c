use crate::exchange::{
    apply_bulk_import, export_all, export_dataset, merge_tables, parse_table_set,
    read_json_file, write_json_file, BulkImportSummary, ImportDocument, ImportError,
};
use crate::ipc::helpers::{
    param_opt_str, param_str, require_workspace, respond, to_json, with_saved, HandlerErr,
    HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};

fn io_failed(e: anyhow::Error) -> HandlerErr {
    HandlerErr::new("io_failed", format!("{e:#}"))
}

/// Import payload from `params.path` (a JSON file) or inline `params.document`.
fn import_value(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    if let Some(path) = param_opt_str(req, "path")? {
        let text = read_json_file(Path::new(path)).map_err(io_failed)?;
        let value = serde_json::from_str(&text).map_err(ImportError::NotJson)?;
        return Ok(value);
    }
    match req.params.get("document") {
        Some(doc) if !doc.is_null() => Ok(doc.clone()),
        _ => Err(HandlerErr::new("bad_params", "missing path or document")),
    }
}

fn exchange_import_merge(state: &mut AppState, req: &Request) -> HandlerResult {
    require_workspace(state)?;
    let tables = parse_table_set(import_value(req)?)?;
    let table_count = tables.len();

    let dataset = require_workspace(state)?.current_mut()?;
    let summary = merge_tables(dataset, tables);
    info!(
        dataset_id = %dataset.id,
        table_count,
        tables_added = summary.tables_added,
        tables_updated = summary.tables_updated,
        students_added = summary.students_added,
        students_updated = summary.students_updated,
        "tables merged"
    );
    let dataset_id = dataset.id.clone();
    let summary = to_json(&summary)?;
    Ok(with_saved(
        state,
        json!({ "datasetId": dataset_id, "summary": summary }),
    ))
}

fn exchange_import_bulk(state: &mut AppState, req: &Request) -> HandlerResult {
    let paths: Vec<String> = match req.params.get("paths").and_then(|v| v.as_array()) {
        Some(items) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| HandlerErr::new("bad_params", "paths must be strings"))
            })
            .collect::<Result<_, _>>()?,
        None => return Err(HandlerErr::new("bad_params", "missing paths")),
    };
    let data = require_workspace(state)?;

    // Files are applied in request order, so a later file naming the same
    // dataset id replaces an earlier one. One write at the end.
    let mut total = BulkImportSummary::default();
    let mut applied = Vec::new();
    let mut failed = Vec::new();
    for path in &paths {
        let parsed = read_json_file(Path::new(path))
            .map_err(io_failed)
            .and_then(|text| ImportDocument::parse_str(&text).map_err(HandlerErr::from));
        match parsed {
            Ok(doc) => {
                let shape = doc.shape();
                let count = doc.dataset_count();
                let summary = apply_bulk_import(data, doc);
                if !summary.rejected.is_empty() {
                    warn!(
                        path = %path,
                        rejected = summary.rejected.len(),
                        "bulk import skipped invalid datasets"
                    );
                }
                total.datasets_added += summary.datasets_added;
                total.datasets_replaced += summary.datasets_replaced;
                applied.push(json!({
                    "path": path,
                    "shape": shape,
                    "datasets": count,
                    "rejected": summary.rejected,
                }));
            }
            Err(e) => {
                warn!(path = %path, code = e.code, message = %e.message, "bulk import file rejected");
                failed.push(json!({
                    "path": path,
                    "code": e.code,
                    "message": e.message,
                    "details": e.details,
                }));
            }
        }
    }

    if applied.is_empty() && !failed.is_empty() {
        return Err(HandlerErr::new("import_failed", "no import file could be read")
            .with_details(json!({ "failed": failed })));
    }

    info!(
        files = paths.len(),
        applied = applied.len(),
        datasets_added = total.datasets_added,
        datasets_replaced = total.datasets_replaced,
        "bulk import finished"
    );
    let summary = to_json(&total)?;
    Ok(with_saved(
        state,
        json!({
            "summary": summary,
            "applied": applied,
            "failed": failed,
            "currentDatasetId": state.data.current_dataset_id,
        }),
    ))
}

fn exchange_export_dataset(state: &mut AppState, req: &Request) -> HandlerResult {
    let out_path = param_str(req, "outPath")?;
    let dataset_id = param_opt_str(req, "datasetId")?;
    let data = require_workspace(state)?;
    let dataset = match dataset_id {
        Some(id) => data.dataset(id).ok_or_else(|| {
            HandlerErr::new("not_found", "dataset not found").with_details(json!({ "datasetId": id }))
        })?,
        None => data.current()?,
    };

    let value = export_dataset(dataset).map_err(io_failed)?;
    write_json_file(Path::new(out_path), &value).map_err(io_failed)?;
    Ok(json!({ "datasetId": dataset.id, "outPath": out_path }))
}

fn exchange_export_all(state: &mut AppState, req: &Request) -> HandlerResult {
    let out_path = param_str(req, "outPath")?;
    let data = require_workspace(state)?;
    let value = export_all(data).map_err(io_failed)?;
    write_json_file(Path::new(out_path), &value).map_err(io_failed)?;
    Ok(json!({
        "datasetCount": data.result_datasets.len(),
        "outPath": out_path,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "exchange.importMerge" => exchange_import_merge(state, req),
        "exchange.importBulk" => exchange_import_bulk(state, req),
        "exchange.exportDataset" => exchange_export_dataset(state, req),
        "exchange.exportAll" => exchange_export_all(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
