//! Mutations on the in-memory gradebook.
//!
//! Every operation that can change a mark, a column or the roster finishes by
//! recalculating the affected table, so callers never see stale totals.

use crate::calc;
use crate::model::{numeric_suffix, AppData, CatColumn, Dataset, Student, Table, EXAM_MAX};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_DATASET_NAME: &str = "Default Dataset";

#[derive(Debug, Error)]
pub enum GradebookError {
    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl GradebookError {
    pub fn code(&self) -> &'static str {
        match self {
            GradebookError::Validation(_) => "validation_failed",
            GradebookError::NotFound { .. } => "not_found",
        }
    }

    fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        GradebookError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GradebookError>;

fn require_name(raw: &str, what: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GradebookError::Validation(format!(
            "{what} name must not be empty"
        )));
    }
    Ok(name.to_string())
}

/// Lowest `prefix-N` (N >= 1) not present in `taken`.
fn first_free_id<'a>(prefix: &str, taken: impl Iterator<Item = &'a str>) -> String {
    let taken: HashSet<&str> = taken.collect();
    (1..=i64::MAX)
        .map(|n| format!("{prefix}-{n}"))
        .find(|id| !taken.contains(id.as_str()))
        .unwrap_or_else(|| format!("{prefix}-{}", Uuid::new_v4()))
}

impl AppData {
    pub fn with_default_dataset() -> Self {
        let mut data = AppData::default();
        data.ensure_current();
        data
    }

    /// Guarantees exactly one current dataset, creating a default one when the
    /// document has none.
    pub fn ensure_current(&mut self) {
        if self.result_datasets.is_empty() {
            let dataset = Dataset::new(DEFAULT_DATASET_NAME);
            self.current_dataset_id = dataset.id.clone();
            self.result_datasets.push(dataset);
            return;
        }
        if self.dataset(&self.current_dataset_id).is_none() {
            self.current_dataset_id = self.result_datasets[0].id.clone();
        }
    }

    pub fn dataset(&self, id: &str) -> Option<&Dataset> {
        self.result_datasets.iter().find(|d| d.id == id)
    }

    pub fn dataset_mut(&mut self, id: &str) -> Result<&mut Dataset> {
        self.result_datasets
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| GradebookError::not_found("dataset", id))
    }

    pub fn current(&self) -> Result<&Dataset> {
        self.dataset(&self.current_dataset_id)
            .ok_or_else(|| GradebookError::not_found("dataset", &self.current_dataset_id))
    }

    pub fn current_mut(&mut self) -> Result<&mut Dataset> {
        let id = self.current_dataset_id.clone();
        self.dataset_mut(&id)
    }

    pub fn create_dataset(&mut self, name: &str) -> Result<String> {
        let dataset = Dataset::new(&require_name(name, "dataset")?);
        let id = dataset.id.clone();
        self.result_datasets.push(dataset);
        Ok(id)
    }

    pub fn rename_dataset(&mut self, id: &str, name: &str) -> Result<()> {
        let name = require_name(name, "dataset")?;
        self.dataset_mut(id)?.name = name;
        Ok(())
    }

    pub fn select_dataset(&mut self, id: &str) -> Result<()> {
        if self.dataset(id).is_none() {
            return Err(GradebookError::not_found("dataset", id));
        }
        self.current_dataset_id = id.to_string();
        Ok(())
    }

    pub fn delete_dataset(&mut self, id: &str) -> Result<()> {
        let Some(pos) = self.result_datasets.iter().position(|d| d.id == id) else {
            return Err(GradebookError::not_found("dataset", id));
        };
        self.result_datasets.remove(pos);
        self.ensure_current();
        Ok(())
    }
}

impl Dataset {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            tables: Vec::new(),
            table_counter: 0,
        }
    }

    pub fn table(&self, id: &str) -> Result<&Table> {
        self.tables
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| GradebookError::not_found("table", id))
    }

    pub fn table_mut(&mut self, id: &str) -> Result<&mut Table> {
        self.tables
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| GradebookError::not_found("table", id))
    }

    /// Moves the counter past every numeric suffix already in use, then hands
    /// out the next `table-N`. An exhausted counter falls back to the lowest
    /// free N.
    pub fn mint_table_id(&mut self) -> String {
        let highest = self
            .tables
            .iter()
            .filter_map(|t| numeric_suffix(&t.id))
            .max()
            .unwrap_or(0);
        let counter = self.table_counter.max(highest);
        match counter.checked_add(1) {
            Some(next) => {
                self.table_counter = next;
                format!("table-{next}")
            }
            None => {
                self.table_counter = counter;
                first_free_id("table", self.tables.iter().map(|t| t.id.as_str()))
            }
        }
    }

    fn check_table_name_free(&self, name: &str, except: Option<&str>) -> Result<()> {
        let taken = self
            .tables
            .iter()
            .any(|t| t.name == name && Some(t.id.as_str()) != except);
        if taken {
            return Err(GradebookError::Validation(format!(
                "a table named \"{name}\" already exists"
            )));
        }
        Ok(())
    }

    pub fn add_table(&mut self, name: &str) -> Result<String> {
        let name = require_name(name, "table")?;
        self.check_table_name_free(&name, None)?;
        let id = self.mint_table_id();
        self.tables.push(Table {
            id: id.clone(),
            name,
            cat_columns: Vec::new(),
            students: Vec::new(),
        });
        Ok(id)
    }

    /// New table with the source's roster names and column layout, all marks 0.
    pub fn clone_table_names(&mut self, source_id: &str, name: &str) -> Result<String> {
        let name = require_name(name, "table")?;
        self.check_table_name_free(&name, None)?;
        let source = self.table(source_id)?;
        let cat_columns = source.cat_columns.clone();
        let students: Vec<Student> = source
            .students
            .iter()
            .map(|s| Student::named(s.name.clone()))
            .collect();

        let id = self.mint_table_id();
        let mut table = Table {
            id: id.clone(),
            name,
            cat_columns,
            students,
        };
        calc::recalculate_table(&mut table);
        self.tables.push(table);
        Ok(id)
    }

    pub fn rename_table(&mut self, id: &str, name: &str) -> Result<()> {
        let name = require_name(name, "table")?;
        self.check_table_name_free(&name, Some(id))?;
        self.table_mut(id)?.name = name;
        Ok(())
    }

    pub fn delete_table(&mut self, id: &str) -> Result<()> {
        let Some(pos) = self.tables.iter().position(|t| t.id == id) else {
            return Err(GradebookError::not_found("table", id));
        };
        self.tables.remove(pos);
        Ok(())
    }
}

impl Table {
    pub fn column(&self, id: &str) -> Result<&CatColumn> {
        self.cat_columns
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| GradebookError::not_found("column", id))
    }

    pub fn student(&self, row: usize) -> Result<&Student> {
        self.students
            .get(row)
            .ok_or_else(|| GradebookError::not_found("student", row.to_string()))
    }

    fn student_mut(&mut self, row: usize) -> Result<&mut Student> {
        self.students
            .get_mut(row)
            .ok_or_else(|| GradebookError::not_found("student", row.to_string()))
    }

    pub fn mint_column_id(&self) -> String {
        let highest = self
            .cat_columns
            .iter()
            .filter_map(|c| numeric_suffix(&c.id))
            .max()
            .unwrap_or(0);
        match highest.checked_add(1) {
            Some(next) => format!("cat-{next}"),
            None => first_free_id("cat", self.cat_columns.iter().map(|c| c.id.as_str())),
        }
    }

    pub fn recalculate(&mut self) {
        calc::recalculate_table(self);
    }

    fn validate_column(&self, name: &str, max_score: i64, except: Option<&str>) -> Result<String> {
        let name = require_name(name, "column")?;
        if max_score <= 0 {
            return Err(GradebookError::Validation(
                "max score must be a positive number".to_string(),
            ));
        }
        let taken = self
            .cat_columns
            .iter()
            .any(|c| c.name == name && Some(c.id.as_str()) != except);
        if taken {
            return Err(GradebookError::Validation(format!(
                "a column named \"{name}\" already exists"
            )));
        }
        Ok(name)
    }

    pub fn add_cat_column(&mut self, name: &str, max_score: i64) -> Result<String> {
        let name = self.validate_column(name, max_score, None)?;
        let id = self.mint_column_id();
        self.cat_columns.push(CatColumn {
            id: id.clone(),
            name,
            max_score,
        });
        for s in &mut self.students {
            s.cat_marks.set(&id, 0);
        }
        self.recalculate();
        Ok(id)
    }

    /// Renames and/or rescales a column. A lower max clamps existing marks down.
    pub fn edit_cat_column(
        &mut self,
        id: &str,
        name: Option<&str>,
        max_score: Option<i64>,
    ) -> Result<()> {
        let current = self.column(id)?.clone();
        let name = name.unwrap_or(current.name.as_str());
        let max_score = max_score.unwrap_or(current.max_score);
        let name = self.validate_column(name, max_score, Some(id))?;

        if let Some(col) = self.cat_columns.iter_mut().find(|c| c.id == id) {
            col.name = name;
            col.max_score = max_score;
        }
        self.recalculate();
        Ok(())
    }

    pub fn delete_cat_column(&mut self, id: &str) -> Result<()> {
        let Some(pos) = self.cat_columns.iter().position(|c| c.id == id) else {
            return Err(GradebookError::not_found("column", id));
        };
        self.cat_columns.remove(pos);
        for s in &mut self.students {
            s.cat_marks.remove(id);
        }
        self.recalculate();
        Ok(())
    }

    pub fn add_student(&mut self, name: &str) -> Result<usize> {
        let name = require_name(name, "student")?;
        self.students.push(Student::named(name));
        self.recalculate();
        Ok(self.students.len() - 1)
    }

    pub fn rename_student(&mut self, row: usize, name: &str) -> Result<()> {
        let name = require_name(name, "student")?;
        self.student_mut(row)?.name = name;
        Ok(())
    }

    pub fn delete_student(&mut self, row: usize) -> Result<Student> {
        if row >= self.students.len() {
            return Err(GradebookError::not_found("student", row.to_string()));
        }
        let removed = self.students.remove(row);
        self.recalculate();
        Ok(removed)
    }

    /// Stores the normalized mark and returns it.
    pub fn set_cat_mark(&mut self, row: usize, column_id: &str, input: &str) -> Result<i64> {
        let max = self.column(column_id)?.max_score;
        let mark = calc::normalize_mark(input, max);
        self.student_mut(row)?.cat_marks.set(column_id, mark);
        self.recalculate();
        Ok(mark)
    }

    pub fn set_exam(&mut self, row: usize, input: &str) -> Result<i64> {
        let mark = calc::normalize_mark(input, EXAM_MAX);
        self.student_mut(row)?.exam = mark;
        self.recalculate();
        Ok(mark)
    }
}
