use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Category marks are summed and then capped at this value.
pub const CAT_TOTAL_CAP: i64 = 50;
pub const EXAM_MAX: i64 = 50;
/// Used when a stored column has no usable max score.
pub const DEFAULT_MAX_SCORE: i64 = 15;

/// The whole persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default)]
    pub result_datasets: Vec<Dataset>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub current_dataset_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub table_counter: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub cat_columns: Vec<CatColumn>,
    #[serde(default)]
    pub students: Vec<Student>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatColumn {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub max_score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub cat_marks: CatMarks,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub exam: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub cat_total: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub position: i64,
}

impl Student {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Marks keyed by category column id, kept in insertion order.
///
/// Serialized as a JSON object (`{"cat-1": 12, ...}`). Missing keys read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatMarks(Vec<(String, i64)>);

impl CatMarks {
    pub fn get(&self, column_id: &str) -> i64 {
        self.0
            .iter()
            .find(|(k, _)| k == column_id)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }

    pub fn set(&mut self, column_id: &str, value: i64) {
        match self.0.iter_mut().find(|(k, _)| k == column_id) {
            Some(entry) => entry.1 = value,
            None => self.0.push((column_id.to_string(), value)),
        }
    }

    pub fn remove(&mut self, column_id: &str) -> Option<i64> {
        let pos = self.0.iter().position(|(k, _)| k == column_id)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, i64)> for CatMarks {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        let mut marks = CatMarks::default();
        for (k, v) in iter {
            marks.set(&k, v);
        }
        marks
    }
}

impl Serialize for CatMarks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CatMarks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Older documents stored marks as strings or nulls; anything that is not
        // an object is treated as "no marks".
        let raw = serde_json::Value::deserialize(deserializer)?;
        let Some(obj) = raw.as_object() else {
            return Ok(CatMarks::default());
        };
        Ok(obj
            .iter()
            .map(|(k, v)| (k.clone(), coerce_i64(v)))
            .collect())
    }
}

/// Best-effort integer coercion for persisted numeric fields.
pub fn coerce_i64(v: &serde_json::Value) -> i64 {
    match v {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| (f + 0.5).floor() as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| (f + 0.5).floor() as i64)
            .unwrap_or(0),
        _ => 0,
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_i64(&raw))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Trailing decimal digits of an id such as `table-12` or `cat7`.
pub fn numeric_suffix(id: &str) -> Option<i64> {
    let digits: String = id
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok()
}
