use crate::backup::{export_workspace_bundle, import_workspace_bundle};
use crate::ipc::helpers::{param_str, require_workspace, respond, with_saved, HandlerErr, HandlerResult};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::Path;
use tracing::info;

fn backup_export_bundle(state: &mut AppState, req: &Request) -> HandlerResult {
    let out_path = param_str(req, "outPath")?;
    let data = require_workspace(state)?;
    let summary = export_workspace_bundle(data, Path::new(out_path))
        .map_err(|e| HandlerErr::new("io_failed", format!("{e:#}")))?;
    Ok(json!({
        "outPath": out_path,
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "sha256": summary.sha256,
    }))
}

/// Replaces the whole live document with the bundle's contents.
fn backup_import_bundle(state: &mut AppState, req: &Request) -> HandlerResult {
    let in_path = param_str(req, "inPath")?;
    require_workspace(state)?;
    let imported = import_workspace_bundle(Path::new(in_path))
        .map_err(|e| HandlerErr::new("import_failed", format!("{e:#}")))?;

    info!(
        format = %imported.bundle_format_detected,
        datasets = imported.data.result_datasets.len(),
        "backup restored"
    );
    state.data = imported.data;
    Ok(with_saved(
        state,
        json!({
            "bundleFormatDetected": imported.bundle_format_detected,
            "datasetCount": state.data.result_datasets.len(),
            "currentDatasetId": state.data.current_dataset_id,
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.exportBundle" => backup_export_bundle(state, req),
        "backup.importBundle" => backup_import_bundle(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
