//! Storage backends for configuration documents.
//!
//! A document is a YAML mapping tree. Backends only move whole trees in and
//! out of storage; typed access lives in [`crate::ConfigDocument`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_yaml::{Mapping, Value};
use tokio_rusqlite::rusqlite::{self, Connection, params};
use tracing::{debug, info};

use crate::document::insert_path;
use crate::error::{Result, StoreError};

/// Where a document lives. Implementations must be safe to share between the
/// ticker and request handlers.
pub trait StorageBackend: Send + Sync {
  /// Human readable location, used in logs and errors.
  fn describe(&self) -> String;

  /// Whether a document has ever been written to this backend.
  fn exists(&self) -> Result<bool>;

  /// Read the full document tree.
  fn read(&self) -> Result<Mapping>;

  /// Replace the stored document with `doc`.
  fn write(&self, doc: &Mapping) -> Result<()>;
}

// ========================================================================
// Flat YAML file
// ========================================================================

/// A YAML document on disk.
#[derive(Debug, Clone)]
pub struct FileBackend {
  path: PathBuf,
}

impl FileBackend {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn io_error(&self, source: std::io::Error) -> StoreError {
    StoreError::Io {
      path: self.path.clone(),
      source,
    }
  }
}

impl StorageBackend for FileBackend {
  fn describe(&self) -> String {
    self.path.display().to_string()
  }

  fn exists(&self) -> Result<bool> {
    self.path.try_exists().map_err(|e| self.io_error(e))
  }

  fn read(&self) -> Result<Mapping> {
    let text = match fs::read_to_string(&self.path) {
      Ok(text) => text,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(StoreError::Missing(self.describe()));
      }
      Err(e) => return Err(self.io_error(e)),
    };
    parse_document(&text)
  }

  fn write(&self, doc: &Mapping) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
      }
    }

    // Write next to the target and rename so a crash never leaves a torn file
    let mut tmp = self.path.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let text = serde_yaml::to_string(doc)?;
    fs::write(&tmp, text).map_err(|e| self.io_error(e))?;
    fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

    debug!(path = %self.path.display(), "wrote document");
    Ok(())
  }
}

/// Parse YAML text into a document root. An empty file is an empty document.
pub fn parse_document(text: &str) -> Result<Mapping> {
  if text.trim().is_empty() {
    return Ok(Mapping::new());
  }
  match serde_yaml::from_str::<Value>(text)? {
    Value::Mapping(root) => Ok(root),
    Value::Null => Ok(Mapping::new()),
    other => Err(StoreError::Malformed(format!(
      "document root must be a mapping, found {}",
      value_kind(&other)
    ))),
  }
}

fn value_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Sequence(_) => "sequence",
    Value::Mapping(_) => "mapping",
    Value::Tagged(_) => "tagged value",
  }
}

// ========================================================================
// Key/value table
// ========================================================================

const DOCUMENTS_TABLE: &str = "stored_documents";

/// A document stored as rows of a `(setting, value)` table.
///
/// Nested keys are flattened to dotted paths and each leaf is stored as YAML
/// text, so several documents can share one database file under different
/// table names. A shared `stored_documents` table records which documents
/// have been written, so an emptied document still counts as existing.
pub struct SqliteBackend {
  conn: Mutex<Connection>,
  table: String,
  location: String,
}

impl SqliteBackend {
  /// Open or create a database at the given path.
  pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
    let path = path.as_ref();
    let conn = Connection::open(path)?;
    // Enable WAL mode for better concurrent read/write performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Self::initialize(conn, table, path.display().to_string())
  }

  /// Create an in-memory database (useful for testing).
  pub fn open_in_memory(table: &str) -> Result<Self> {
    let conn = Connection::open_in_memory()?;
    Self::initialize(conn, table, ":memory:".to_string())
  }

  fn initialize(conn: Connection, table: &str, location: String) -> Result<Self> {
    if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
      return Err(StoreError::Malformed(format!("invalid table name '{table}'")));
    }

    conn.execute_batch(&format!(
      "CREATE TABLE IF NOT EXISTS {table} (setting TEXT PRIMARY KEY, value TEXT NOT NULL);
       CREATE TABLE IF NOT EXISTS {DOCUMENTS_TABLE} (name TEXT PRIMARY KEY);"
    ))?;

    info!(%location, %table, "settings table initialized");
    Ok(Self {
      conn: Mutex::new(conn),
      table: table.to_string(),
      location,
    })
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
    self.conn.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl StorageBackend for SqliteBackend {
  fn describe(&self) -> String {
    format!("{}#{}", self.location, self.table)
  }

  fn exists(&self) -> Result<bool> {
    let conn = self.lock();
    let exists: bool = conn.query_row(
      &format!("SELECT EXISTS(SELECT 1 FROM {DOCUMENTS_TABLE} WHERE name = ?1)"),
      params![self.table],
      |row| row.get(0),
    )?;
    Ok(exists)
  }

  fn read(&self) -> Result<Mapping> {
    if !self.exists()? {
      return Err(StoreError::Missing(self.describe()));
    }

    let rows = {
      let conn = self.lock();
      let mut stmt = conn.prepare(&format!(
        "SELECT setting, value FROM {} ORDER BY rowid",
        self.table
      ))?;
      stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?
    };

    let mut root = Mapping::new();
    for (setting, text) in rows {
      let value: Value = serde_yaml::from_str(&text)?;
      insert_path(&mut root, &setting, value);
    }
    Ok(root)
  }

  fn write(&self, doc: &Mapping) -> Result<()> {
    let mut rows = Vec::new();
    flatten("", doc, &mut rows)?;

    let mut conn = self.lock();
    let tx = conn.transaction()?;
    tx.execute(&format!("DELETE FROM {}", self.table), [])?;
    {
      let mut insert = tx.prepare(&format!(
        "INSERT INTO {} (setting, value) VALUES (?1, ?2)",
        self.table
      ))?;
      for (setting, value) in &rows {
        insert.execute(params![setting, value])?;
      }
    }
    tx.execute(
      &format!("INSERT OR IGNORE INTO {DOCUMENTS_TABLE} (name) VALUES (?1)"),
      params![self.table],
    )?;
    tx.commit()?;

    debug!(table = %self.table, rows = rows.len(), "wrote document");
    Ok(())
  }
}

fn flatten(prefix: &str, map: &Mapping, out: &mut Vec<(String, String)>) -> Result<()> {
  for (key, value) in map {
    let key = match key {
      Value::String(s) => s.clone(),
      Value::Number(n) => n.to_string(),
      Value::Bool(b) => b.to_string(),
      other => {
        return Err(StoreError::Malformed(format!(
          "unsupported {} key under '{prefix}'",
          value_kind(other)
        )));
      }
    };
    let path = if prefix.is_empty() {
      key
    } else {
      format!("{prefix}.{key}")
    };

    match value {
      Value::Mapping(child) if !child.is_empty() => flatten(&path, child, out)?,
      leaf => {
        let text = serde_yaml::to_string(leaf)?;
        out.push((path, text.trim_end_matches('\n').to_string()));
      }
    }
  }
  Ok(())
}

// ========================================================================
// In-memory
// ========================================================================

/// Keeps the document in process memory.
#[derive(Default)]
pub struct MemoryBackend {
  doc: Mutex<Option<Mapping>>,
}

impl MemoryBackend {
  /// A backend with nothing stored yet.
  pub fn new() -> Self {
    Self::default()
  }

  /// A backend pre-populated from YAML text.
  pub fn from_yaml(text: &str) -> Result<Self> {
    Ok(Self {
      doc: Mutex::new(Some(parse_document(text)?)),
    })
  }
}

impl StorageBackend for MemoryBackend {
  fn describe(&self) -> String {
    "memory".to_string()
  }

  fn exists(&self) -> Result<bool> {
    Ok(self.doc.lock().unwrap_or_else(PoisonError::into_inner).is_some())
  }

  fn read(&self) -> Result<Mapping> {
    self
      .doc
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
      .ok_or_else(|| StoreError::Missing(self.describe()))
  }

  fn write(&self, doc: &Mapping) -> Result<()> {
    *self.doc.lock().unwrap_or_else(PoisonError::into_inner) = Some(doc.clone());
    Ok(())
  }
}
