mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::*;

/// Persistence used by generated mutators and for running scopes.
pub trait DocumentStore {
    /// Insert the document or overwrite the stored copy with the same id.
    fn save(&self, document: &Document) -> Result<()>;

    fn get_document(&self, id: Uuid) -> Result<Option<Document>>;

    /// Documents matching `criteria`, oldest first.
    fn find(&self, criteria: &Criteria) -> Result<Vec<Document>>;
}

/// SQLite document store. Each document is one row with a JSON body.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const DOCUMENT_COLUMNS: &str = "id, model, collection, body, created_at, updated_at";

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "docenum")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("docenum.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        schema::run_migrations(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }

    // ============================================================
    // Document operations
    // ============================================================

    pub fn insert_document(&self, input: CreateDocumentInput) -> Result<Document> {
        let mut document = Document::new(input.model, input.collection);
        document.fields = input.fields;
        self.save(&document)?;
        Ok(document)
    }

    pub fn get_documents_by_collection(&self, collection: &str) -> Result<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection = ? ORDER BY created_at, id"
        ))?;

        let documents = stmt
            .query_map([collection], row_to_document)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(documents)
    }

    pub fn delete_document(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM documents WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }
}

impl DocumentStore for Database {
    fn save(&self, document: &Document) -> Result<()> {
        let body =
            serde_json::to_string(&document.fields).context("Failed to serialize document")?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (id, model, collection, body, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                model = excluded.model,
                collection = excluded.collection,
                body = excluded.body,
                updated_at = excluded.updated_at",
            (
                document.id.to_string(),
                &document.model,
                &document.collection,
                body,
                document.created_at.to_rfc3339(),
                document.updated_at.to_rfc3339(),
            ),
        )
        .with_context(|| format!("Failed to save document {}", document.id))?;
        Ok(())
    }

    fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row_to_document(row)?))
        } else {
            Ok(None)
        }
    }

    fn find(&self, criteria: &Criteria) -> Result<Vec<Document>> {
        let (sql, params) = criteria_query(criteria);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;

        let documents = stmt
            .query_map(rusqlite::params_from_iter(params), row_to_document)?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            model = %criteria.model(),
            collection = %criteria.collection(),
            matched = documents.len(),
            "Ran criteria"
        );

        Ok(documents)
    }
}

/// Build the SQL for a criteria. Selector fields are read from the JSON body.
fn criteria_query(criteria: &Criteria) -> (String, Vec<SqlValue>) {
    let mut sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection = ?");
    let mut params = vec![SqlValue::Text(criteria.collection().to_string())];

    if !criteria.types().is_empty() {
        let placeholders = vec!["?"; criteria.types().len()].join(", ");
        sql.push_str(&format!(" AND model IN ({placeholders})"));
        params.extend(criteria.types().iter().cloned().map(SqlValue::Text));
    }

    for (field, expected) in criteria.selector() {
        params.push(SqlValue::Text(json_path(field)));
        match expected {
            Value::Null => sql.push_str(" AND json_extract(body, ?) IS NULL"),
            Value::Array(_) | Value::Object(_) => {
                sql.push_str(" AND json_extract(body, ?) = json(?)");
                params.push(SqlValue::Text(expected.to_string()));
            }
            scalar => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                params.push(to_sql_value(scalar));
            }
        }
    }

    sql.push_str(" ORDER BY created_at, id");
    (sql, params)
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

/// SQL value `json_extract` yields for a scalar JSON value.
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: parse_uuid(row.get::<_, String>(0)?),
        model: row.get(1)?,
        collection: row.get(2)?,
        fields: parse_body(row.get::<_, String>(3)?),
        created_at: parse_datetime(row.get::<_, String>(4)?),
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_body(s: String) -> Map<String, Value> {
    serde_json::from_str(&s).unwrap_or_default()
}
