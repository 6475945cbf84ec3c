//! Load-time validation and backfill for documents written by older versions.

use crate::calc;
use crate::model::{numeric_suffix, AppData, Dataset, Table, DEFAULT_MAX_SCORE};
use std::collections::HashSet;
use uuid::Uuid;

/// First reason `value` is not an importable dataset, if any.
pub fn dataset_defect(value: &serde_json::Value) -> Option<&'static str> {
    let Some(obj) = value.as_object() else {
        return Some("dataset must be an object");
    };
    let has_id = obj
        .get("id")
        .map(|v| (v.is_string() && v.as_str() != Some("")) || v.is_number())
        .unwrap_or(false);
    if !has_id {
        return Some("missing id");
    }
    if !obj.get("name").map(|v| v.is_string()).unwrap_or(false) {
        return Some("missing name");
    }
    if !obj.get("tables").map(|v| v.is_array()).unwrap_or(false) {
        return Some("missing tables array");
    }
    if !obj.get("tableCounter").map(|v| v.is_number()).unwrap_or(false) {
        return Some("missing numeric tableCounter");
    }
    None
}

pub fn is_valid_dataset(value: &serde_json::Value) -> bool {
    dataset_defect(value).is_none()
}

/// Backfills everything a dataset needs to satisfy the model invariants and
/// returns how many fields were changed. Totals and positions are always
/// recomputed, and those refreshes are not counted.
pub fn validate_and_repair_dataset(dataset: &mut Dataset) -> usize {
    let mut fixes = 0;
    if dataset.id.trim().is_empty() {
        dataset.id = Uuid::new_v4().to_string();
        fixes += 1;
    }
    if dataset.name.trim().is_empty() {
        dataset.name = "Untitled Dataset".to_string();
        fixes += 1;
    }

    let highest = dataset
        .tables
        .iter()
        .filter_map(|t| numeric_suffix(&t.id))
        .max()
        .unwrap_or(0);
    if dataset.table_counter < highest {
        dataset.table_counter = highest;
        fixes += 1;
    }

    // Tables without a usable id get one minted after the counter is settled.
    let mut seen: HashSet<String> = HashSet::new();
    let mut needs_id: Vec<usize> = Vec::new();
    for (i, t) in dataset.tables.iter().enumerate() {
        if t.id.trim().is_empty() || !seen.insert(t.id.clone()) {
            needs_id.push(i);
        }
    }
    for i in needs_id {
        dataset.tables[i].id = dataset.mint_table_id();
        fixes += 1;
    }

    for (i, table) in dataset.tables.iter_mut().enumerate() {
        if table.name.trim().is_empty() {
            table.name = format!("Table {}", i + 1);
            fixes += 1;
        }
        fixes += repair_table(table);
    }
    fixes
}

/// Column and roster repair for one table; ends with a full recalculation.
pub fn repair_table(table: &mut Table) -> usize {
    let mut fixes = 0;

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut needs_id: Vec<usize> = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    for i in 0..table.cat_columns.len() {
        let col = &mut table.cat_columns[i];
        if col.id.trim().is_empty() || !seen_ids.insert(col.id.clone()) {
            needs_id.push(i);
        }
        if col.name.trim().is_empty() {
            col.name = format!("CAT {}", i + 1);
            fixes += 1;
        }
        if !seen_names.insert(col.name.clone()) {
            let mut n = 2;
            while seen_names.contains(&format!("{} ({})", col.name, n)) {
                n += 1;
            }
            col.name = format!("{} ({})", col.name, n);
            seen_names.insert(col.name.clone());
            fixes += 1;
        }
        if col.max_score <= 0 {
            col.max_score = DEFAULT_MAX_SCORE;
            fixes += 1;
        }
    }
    for i in needs_id {
        // Marks stored under a duplicate id stay with the first column.
        table.cat_columns[i].id = table.mint_column_id();
        fixes += 1;
    }

    for (i, student) in table.students.iter_mut().enumerate() {
        if student.name.trim().is_empty() {
            student.name = format!("Student {}", i + 1);
            fixes += 1;
        }
    }

    calc::recalculate_table(table);
    fixes
}

/// Repairs every dataset, drops later duplicates of a dataset id, and settles
/// the current dataset pointer.
pub fn repair_app_data(data: &mut AppData) -> usize {
    let mut fixes = 0;
    let mut seen: HashSet<String> = HashSet::new();
    let before = data.result_datasets.len();
    data.result_datasets.retain(|d| d.id.is_empty() || seen.insert(d.id.clone()));
    fixes += before - data.result_datasets.len();

    for dataset in &mut data.result_datasets {
        fixes += validate_and_repair_dataset(dataset);
    }

    let current = data.current_dataset_id.clone();
    data.ensure_current();
    if data.current_dataset_id != current {
        fixes += 1;
    }
    fixes
}
