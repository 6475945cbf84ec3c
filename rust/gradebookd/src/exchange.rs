//! JSON import/export and reconciliation of imported tables and datasets.

use crate::calc;
use crate::model::{AppData, CatColumn, CatMarks, Dataset, Student, Table};
use crate::repair::{
    dataset_defect, is_valid_dataset, repair_table, validate_and_repair_dataset,
};
use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import file is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    #[error("unrecognized import shape: expected a dataset, a resultDatasets wrapper, or an array of datasets")]
    UnrecognizedShape,

    #[error("dataset is invalid: {0}")]
    InvalidDataset(String),

    #[error("resultDatasets wrapper is invalid: {0}")]
    InvalidWrapper(String),

    #[error("dataset list entry {index} is invalid: {reason}")]
    InvalidListEntry { index: usize, reason: String },

    #[error("table set is invalid: {0}")]
    InvalidTableSet(String),
}

impl ImportError {
    /// Stable identifier of the failing shape, reported alongside `import_failed`.
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::NotJson(_) => "not_json",
            ImportError::UnrecognizedShape => "unrecognized_shape",
            ImportError::InvalidDataset(_) => "invalid_dataset",
            ImportError::InvalidWrapper(_) => "invalid_wrapper",
            ImportError::InvalidListEntry { .. } => "invalid_list_entry",
            ImportError::InvalidTableSet(_) => "invalid_table_set",
        }
    }
}

/// A container entry that failed validation and was left out of the import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedDataset {
    pub index: usize,
    pub reason: String,
}

/// The three accepted top-level import shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportDocument {
    /// `{id, name, tables, tableCounter}`
    Single(Dataset),
    /// `{resultDatasets: [...], currentDatasetId}`
    Bulk {
        datasets: Vec<Dataset>,
        current_dataset_id: Option<String>,
        rejected: Vec<RejectedDataset>,
    },
    /// `[dataset, ...]`
    List {
        datasets: Vec<Dataset>,
        rejected: Vec<RejectedDataset>,
    },
}

fn decode_dataset(value: serde_json::Value) -> Result<Dataset, String> {
    if let Some(reason) = dataset_defect(&value) {
        return Err(reason.to_string());
    }
    let mut dataset: Dataset = serde_json::from_value(value).map_err(|e| e.to_string())?;
    validate_and_repair_dataset(&mut dataset);
    Ok(dataset)
}

/// Gates each entry on its own: valid datasets are kept, the rest are reported.
fn decode_entries(items: Vec<serde_json::Value>) -> (Vec<Dataset>, Vec<RejectedDataset>) {
    let mut datasets = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match decode_dataset(item) {
            Ok(dataset) => datasets.push(dataset),
            Err(reason) => rejected.push(RejectedDataset { index, reason }),
        }
    }
    (datasets, rejected)
}

impl ImportDocument {
    pub fn parse_str(text: &str) -> Result<Self, ImportError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(ImportError::NotJson)?;
        Self::from_value(value)
    }

    /// Fails when the container shape is wrong, or when it holds entries and
    /// none of them is a valid dataset.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ImportError> {
        match value {
            serde_json::Value::Array(items) => {
                let (datasets, rejected) = decode_entries(items);
                if datasets.is_empty() {
                    if let Some(first) = rejected.first() {
                        return Err(ImportError::InvalidListEntry {
                            index: first.index,
                            reason: first.reason.clone(),
                        });
                    }
                }
                Ok(ImportDocument::List { datasets, rejected })
            }
            serde_json::Value::Object(mut obj) if obj.contains_key("resultDatasets") => {
                let current_dataset_id = obj
                    .get("currentDatasetId")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                let Some(serde_json::Value::Array(items)) = obj.remove("resultDatasets") else {
                    return Err(ImportError::InvalidWrapper(
                        "resultDatasets must be an array".to_string(),
                    ));
                };
                let (datasets, rejected) = decode_entries(items);
                if datasets.is_empty() {
                    if let Some(first) = rejected.first() {
                        return Err(ImportError::InvalidWrapper(format!(
                            "entry {}: {}",
                            first.index, first.reason
                        )));
                    }
                }
                Ok(ImportDocument::Bulk {
                    datasets,
                    current_dataset_id,
                    rejected,
                })
            }
            value @ serde_json::Value::Object(_) if value.get("tables").is_some() => {
                let dataset = decode_dataset(value).map_err(ImportError::InvalidDataset)?;
                Ok(ImportDocument::Single(dataset))
            }
            _ => Err(ImportError::UnrecognizedShape),
        }
    }

    pub fn rejected(&self) -> &[RejectedDataset] {
        match self {
            ImportDocument::Single(_) => &[],
            ImportDocument::Bulk { rejected, .. } | ImportDocument::List { rejected, .. } => {
                rejected.as_slice()
            }
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            ImportDocument::Single(_) => "dataset",
            ImportDocument::Bulk { .. } => "bulk",
            ImportDocument::List { .. } => "list",
        }
    }

    pub fn dataset_count(&self) -> usize {
        match self {
            ImportDocument::Single(_) => 1,
            ImportDocument::Bulk { datasets, .. } | ImportDocument::List { datasets, .. } => {
                datasets.len()
            }
        }
    }

    pub fn into_datasets(self) -> Vec<Dataset> {
        match self {
            ImportDocument::Single(d) => vec![d],
            ImportDocument::Bulk { datasets, .. } | ImportDocument::List { datasets, .. } => {
                datasets
            }
        }
    }
}

/// Tables to reconcile into the current dataset.
///
/// Accepts a bare `{tables: [...]}` object (no dataset fields required) or any of
/// the three dataset shapes, whose tables are flattened in order.
pub fn parse_table_set(value: serde_json::Value) -> Result<Vec<Table>, ImportError> {
    let bare_tables = value.is_object()
        && value.get("resultDatasets").is_none()
        && value.get("tables").map(|v| v.is_array()).unwrap_or(false)
        && !is_valid_dataset(&value);
    if bare_tables {
        let raw = value.get("tables").cloned().unwrap_or_default();
        let mut tables: Vec<Table> = serde_json::from_value(raw)
            .map_err(|e| ImportError::InvalidTableSet(e.to_string()))?;
        for t in &mut tables {
            repair_table(t);
        }
        return Ok(tables);
    }

    let doc = ImportDocument::from_value(value)?;
    Ok(doc
        .into_datasets()
        .into_iter()
        .flat_map(|d| d.tables)
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    pub tables_added: usize,
    pub tables_updated: usize,
    pub students_added: usize,
    pub students_updated: usize,
}

/// Reconciles imported tables into `dataset` by display name.
///
/// Matched tables take imported students by exact name: a match overwrites the
/// existing student's exam and the imported marks, anything else is appended.
/// Unmatched tables are appended under a freshly minted id. Student counters
/// only cover matched tables.
pub fn merge_tables(dataset: &mut Dataset, imported: Vec<Table>) -> MergeSummary {
    let mut summary = MergeSummary::default();
    for incoming in imported {
        match dataset.tables.iter().position(|t| t.name == incoming.name) {
            Some(pos) => {
                let (added, updated) = merge_into_table(&mut dataset.tables[pos], incoming);
                summary.tables_updated += 1;
                summary.students_added += added;
                summary.students_updated += updated;
            }
            None => {
                let mut table = incoming;
                table.id = dataset.mint_table_id();
                calc::recalculate_table(&mut table);
                dataset.tables.push(table);
                summary.tables_added += 1;
            }
        }
    }
    summary
}

fn merge_into_table(table: &mut Table, incoming: Table) -> (usize, usize) {
    // Imported column ids mean nothing here; line columns up by name.
    let mut column_map: HashMap<String, String> = HashMap::new();
    for col in incoming.cat_columns {
        let target = match table.cat_columns.iter().find(|c| c.name == col.name) {
            Some(existing) => existing.id.clone(),
            None => {
                let id = table.mint_column_id();
                table.cat_columns.push(CatColumn {
                    id: id.clone(),
                    name: col.name,
                    max_score: col.max_score,
                });
                id
            }
        };
        column_map.insert(col.id, target);
    }

    let mut added = 0;
    let mut updated = 0;
    for student in incoming.students {
        let marks: CatMarks = student
            .cat_marks
            .iter()
            .filter_map(|(k, v)| column_map.get(k).map(|id| (id.clone(), v)))
            .collect();

        match table.students.iter_mut().find(|s| s.name == student.name) {
            Some(existing) => {
                existing.exam = student.exam;
                for (id, v) in marks.iter() {
                    existing.cat_marks.set(id, v);
                }
                updated += 1;
            }
            None => {
                table.students.push(Student {
                    name: student.name,
                    cat_marks: marks,
                    exam: student.exam,
                    ..Student::default()
                });
                added += 1;
            }
        }
    }

    calc::recalculate_table(table);
    (added, updated)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportSummary {
    pub datasets_added: usize,
    pub datasets_replaced: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedDataset>,
}

/// Inserts each dataset, replacing any existing dataset with the same id.
/// Later entries win; nothing is deduplicated across datasets.
pub fn apply_bulk_import(data: &mut AppData, doc: ImportDocument) -> BulkImportSummary {
    let preferred_current = match &doc {
        ImportDocument::Bulk {
            current_dataset_id, ..
        } => current_dataset_id.clone(),
        _ => None,
    };

    let mut summary = BulkImportSummary {
        rejected: doc.rejected().to_vec(),
        ..BulkImportSummary::default()
    };
    for dataset in doc.into_datasets() {
        match data.result_datasets.iter_mut().find(|d| d.id == dataset.id) {
            Some(slot) => {
                *slot = dataset;
                summary.datasets_replaced += 1;
            }
            None => {
                data.result_datasets.push(dataset);
                summary.datasets_added += 1;
            }
        }
    }

    // A wrapper's current pointer is only adopted when ours is dangling.
    if data.dataset(&data.current_dataset_id).is_none() {
        if let Some(id) = preferred_current.filter(|id| data.dataset(id).is_some()) {
            data.current_dataset_id = id;
        }
    }
    data.ensure_current();
    summary
}

pub fn export_dataset(dataset: &Dataset) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(dataset).context("failed to serialize dataset")
}

pub fn export_all(data: &AppData) -> anyhow::Result<serde_json::Value> {
    let datasets =
        serde_json::to_value(&data.result_datasets).context("failed to serialize datasets")?;
    Ok(json!({
        "resultDatasets": datasets,
        "currentDatasetId": data.current_dataset_id,
    }))
}

pub fn write_json_file(path: &Path, value: &serde_json::Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let text = serde_json::to_string_pretty(value).context("failed to serialize export")?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))?;
    Ok(())
}

pub fn read_json_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))
}
