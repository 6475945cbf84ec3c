use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "gradebook.sqlite3";

/// Key holding the whole `{resultDatasets, currentDatasetId}` document.
pub const STATE_KEY: &str = "gradebook.state";

// Browser builds stored the two halves of the document under separate keys.
const LEGACY_DATASETS_KEY: &str = "resultDatasets";
const LEGACY_CURRENT_KEY: &str = "currentDatasetId";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS storage(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    ensure_storage_updated_at(&conn)?;

    migrate_split_state_keys(&conn)?;

    Ok(conn)
}

pub fn storage_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM storage WHERE key = ?", [key], |r| {
            r.get::<_, String>(0)
        })
        .optional()?;
    Ok(value)
}

pub fn storage_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO storage(key, value, updated_at)
         VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value,
           updated_at = excluded.updated_at",
        (key, value, &now),
    )?;
    Ok(())
}

fn ensure_storage_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "storage", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE storage ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn migrate_split_state_keys(conn: &Connection) -> anyhow::Result<()> {
    // Folds the two legacy keys into STATE_KEY once; an existing combined
    // document always wins.
    if storage_get(conn, STATE_KEY)?.is_some() {
        return Ok(());
    }
    let Some(datasets_text) = storage_get(conn, LEGACY_DATASETS_KEY)? else {
        return Ok(());
    };
    let datasets: serde_json::Value = serde_json::from_str(&datasets_text)?;
    let current = storage_get(conn, LEGACY_CURRENT_KEY)?
        .map(|raw| {
            // The current id was written either bare or JSON-quoted.
            serde_json::from_str::<String>(&raw).unwrap_or(raw)
        })
        .unwrap_or_default();

    let doc = serde_json::json!({
        "resultDatasets": datasets,
        "currentDatasetId": current,
    });

    let tx = conn.unchecked_transaction()?;
    storage_set(&tx, STATE_KEY, &doc.to_string())?;
    tx.execute(
        "DELETE FROM storage WHERE key IN (?, ?)",
        (LEGACY_DATASETS_KEY, LEGACY_CURRENT_KEY),
    )?;
    tx.commit()?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
