//! Typed, reloadable configuration documents.

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::backend::{StorageBackend, parse_document};
use crate::error::Result;

/// Escape marker that introduces a color code in user-facing strings.
pub const COLOR_ESCAPE: char = '&';
/// Section sign the client renders as a formatting directive.
pub const SECTION_SIGN: char = '§';

const COLOR_CODES: &str = "0123456789AaBbCcDdEeFfKkLlMmNnOoRrXx";

/// Legacy singular key replaced by the `pingmessages` list.
const LEGACY_PING_MESSAGE: &str = "pingmessage";
const PING_MESSAGES: &str = "pingmessages";

/// A nested key/value tree with path-based typed access.
///
/// Paths are dot separated (`mysql.table`). Edits stay in memory until
/// [`save`](Self::save) is called; [`reload`](Self::reload) throws them away.
pub struct ConfigDocument {
  root: Mapping,
  backend: Box<dyn StorageBackend>,
}

impl ConfigDocument {
  /// Load a document from its backend. Fails if the store is missing,
  /// unreadable or malformed.
  pub fn load(backend: Box<dyn StorageBackend>) -> Result<Self> {
    let root = backend.read()?;
    debug!(location = %backend.describe(), keys = root.len(), "loaded document");
    Ok(Self { root, backend })
  }

  /// Write `defaults` to the backend if nothing is stored yet, then load.
  pub fn provision(backend: Box<dyn StorageBackend>, defaults: &str) -> Result<Self> {
    if !backend.exists()? {
      backend.write(&parse_document(defaults)?)?;
      info!(location = %backend.describe(), "created default document");
    }
    Self::load(backend)
  }

  /// Re-read from storage, discarding unsaved edits.
  pub fn reload(&mut self) -> Result<()> {
    self.reload_with(|_| Ok(()))
  }

  /// Re-read from storage and run `check` on the new tree before adopting
  /// it. If reading or `check` fails, the current tree is left untouched.
  pub fn reload_with<T>(&mut self, check: impl FnOnce(&Mapping) -> Result<T>) -> Result<T> {
    let root = self.backend.read()?;
    let checked = check(&root)?;
    self.root = root;
    debug!(location = %self.backend.describe(), "reloaded document");
    Ok(checked)
  }

  /// Persist the full in-memory tree.
  pub fn save(&self) -> Result<()> {
    self.backend.write(&self.root)
  }

  /// Rewrite deprecated keys to the current schema. Returns whether anything
  /// changed; the document is only saved when it did.
  pub fn migrate(&mut self) -> Result<bool> {
    let Some(legacy) = self.remove(LEGACY_PING_MESSAGE) else {
      return Ok(false);
    };

    let messages = match legacy {
      Value::Null => Vec::new(),
      Value::Sequence(seq) => seq,
      other => vec![other],
    };
    self.set(PING_MESSAGES, Value::Sequence(messages));
    info!(location = %self.backend.describe(), "migrated '{LEGACY_PING_MESSAGE}' to '{PING_MESSAGES}'");

    self.save()?;
    Ok(true)
  }

  pub fn location(&self) -> String {
    self.backend.describe()
  }

  pub fn root(&self) -> &Mapping {
    &self.root
  }

  /// Top-level keys in document order.
  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.root.keys().filter_map(Value::as_str)
  }

  pub fn get(&self, path: &str) -> Option<&Value> {
    let mut segments = path.split('.');
    let mut current = self.root.get(segments.next()?)?;
    for segment in segments {
      current = current.as_mapping()?.get(segment)?;
    }
    Some(current)
  }

  pub fn contains(&self, path: &str) -> bool {
    self.get(path).is_some()
  }

  /// Set a value, creating intermediate sections as needed.
  pub fn set(&mut self, path: &str, value: impl Into<Value>) {
    insert_path(&mut self.root, path, value.into());
  }

  /// Remove a value, returning it if it was present.
  pub fn remove(&mut self, path: &str) -> Option<Value> {
    let (parent, leaf) = match path.rsplit_once('.') {
      Some((parent, leaf)) => (Some(parent), leaf),
      None => (None, path),
    };

    let map = match parent {
      None => &mut self.root,
      Some(parent) => {
        let mut current = &mut self.root;
        for segment in parent.split('.') {
          current = current.get_mut(segment)?.as_mapping_mut()?;
        }
        current
      }
    };
    map.shift_remove(leaf)
  }

  /// Scalar as text without color translation.
  pub fn get_raw_string(&self, path: &str) -> Option<String> {
    scalar_to_string(self.get(path)?)
  }

  /// Scalar as text with `&` color codes translated.
  pub fn get_string(&self, path: &str) -> Option<String> {
    self.get_raw_string(path).map(|s| translate_color_codes(&s))
  }

  pub fn get_string_or(&self, path: &str, default: &str) -> String {
    self
      .get_string(path)
      .unwrap_or_else(|| translate_color_codes(default))
  }

  /// `false` unless the path holds a boolean `true`.
  pub fn get_bool(&self, path: &str) -> bool {
    self.get(path).and_then(Value::as_bool).unwrap_or(false)
  }

  pub fn get_i64(&self, path: &str) -> Option<i64> {
    match self.get(path)? {
      Value::Number(n) => n.as_i64(),
      Value::String(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  /// Integer entries of a list; empty when absent. Non-integer entries are skipped.
  pub fn get_int_list(&self, path: &str) -> Vec<i64> {
    self
      .get(path)
      .and_then(Value::as_sequence)
      .map(|seq| {
        seq
          .iter()
          .filter_map(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
          })
          .collect()
      })
      .unwrap_or_default()
  }

  /// Scalar entries of a list as text; empty when absent.
  pub fn get_string_list(&self, path: &str) -> Vec<String> {
    self
      .get(path)
      .and_then(Value::as_sequence)
      .map(|seq| seq.iter().filter_map(scalar_to_string).collect())
      .unwrap_or_default()
  }
}

fn scalar_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

pub(crate) fn insert_path(root: &mut Mapping, path: &str, value: Value) {
  let (parent, leaf) = match path.rsplit_once('.') {
    Some((parent, leaf)) => (Some(parent), leaf),
    None => (None, path),
  };

  let mut current = root;
  if let Some(parent) = parent {
    for segment in parent.split('.') {
      let key = Value::String(segment.to_string());
      let entry = current
        .entry(key)
        .or_insert_with(|| Value::Mapping(Mapping::new()));
      if !entry.is_mapping() {
        *entry = Value::Mapping(Mapping::new());
      }
      current = match entry {
        Value::Mapping(map) => map,
        _ => unreachable!("entry was just replaced by a mapping"),
      };
    }
  }
  current.insert(Value::String(leaf.to_string()), value);
}

/// Replace `&` followed by a color or format code with the section sign
/// the client understands. Other ampersands are left alone.
pub fn translate_color_codes(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut chars = text.chars().peekable();
  while let Some(c) = chars.next() {
    match chars.peek() {
      Some(&code) if c == COLOR_ESCAPE && COLOR_CODES.contains(code) => {
        out.push(SECTION_SIGN);
        out.push(code.to_ascii_lowercase());
        chars.next();
      }
      _ => out.push(c),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::MemoryBackend;

  fn document(yaml: &str) -> ConfigDocument {
    ConfigDocument::load(Box::new(MemoryBackend::from_yaml(yaml).unwrap())).unwrap()
  }

  #[test]
  fn test_typed_getters() {
    let doc = document(
      r#"
maintenance-enabled: true
timer-broadcast-for-seconds: [1200, 600, 60, "30", nope]
commands-on-enable:
  - say hello
  - 42
messages:
  motdTimer: "&7%HOURS%:%MINUTES%:%SECONDS%"
"#,
    );

    assert!(doc.get_bool("maintenance-enabled"));
    assert_eq!(doc.get_int_list("timer-broadcast-for-seconds"), vec![1200, 600, 60, 30]);
    assert_eq!(doc.get_string_list("commands-on-enable"), vec!["say hello", "42"]);
    assert_eq!(
      doc.get_string("messages.motdTimer").unwrap(),
      "§7%HOURS%:%MINUTES%:%SECONDS%"
    );
    assert_eq!(
      doc.get_raw_string("messages.motdTimer").unwrap(),
      "&7%HOURS%:%MINUTES%:%SECONDS%"
    );
  }

  #[test]
  fn test_absent_paths_use_defaults() {
    let doc = document("kick-on-maintenance: \"yes\"");
    assert!(!doc.get_bool("kick-on-maintenance"));
    assert!(!doc.get_bool("does.not.exist"));
    assert!(doc.get_int_list("timer-broadcast-for-seconds").is_empty());
    assert!(doc.get_string_list("commands-on-disable").is_empty());
    assert_eq!(doc.get_string("messages.missing"), None);
    assert_eq!(doc.get_string_or("messages.missing", "&aok"), "§aok");
  }

  #[test]
  fn test_set_and_remove_nested_paths() {
    let mut doc = document("mysql: 5");
    doc.set("mysql.table", "maintenance");
    doc.set("saved-endtimer", 12_i64);
    assert_eq!(doc.get_raw_string("mysql.table").unwrap(), "maintenance");
    assert_eq!(doc.get_i64("saved-endtimer"), Some(12));

    assert!(doc.remove("mysql.table").is_some());
    assert!(doc.remove("mysql.table").is_none());
    assert!(doc.remove("saved-endtimer.inner").is_none());
    assert!(doc.contains("mysql"));
  }

  #[test]
  fn test_reload_discards_unsaved_edits() {
    let mut doc = document("maintenance-enabled: false");
    doc.set("maintenance-enabled", true);
    assert!(doc.get_bool("maintenance-enabled"));

    doc.reload().unwrap();
    assert!(!doc.get_bool("maintenance-enabled"));

    doc.set("maintenance-enabled", true);
    doc.save().unwrap();
    doc.reload().unwrap();
    assert!(doc.get_bool("maintenance-enabled"));
  }

  #[test]
  fn test_rejected_reload_keeps_current_tree() {
    let mut doc = document("maintenance-enabled: false");
    doc.set("maintenance-enabled", true);

    let rejected = doc.reload_with(|_| -> Result<()> {
      Err(crate::StoreError::Malformed("rejected".to_string()))
    });
    assert!(rejected.is_err());
    assert!(doc.get_bool("maintenance-enabled"));

    let keys = doc.reload_with(|root| Ok(root.len())).unwrap();
    assert_eq!(keys, 1);
    assert!(!doc.get_bool("maintenance-enabled"));
  }

  #[test]
  fn test_migrate_legacy_ping_message() {
    let mut doc = document("enable-ping-messages: true\npingmessage: \"hi\"\n");

    assert!(doc.migrate().unwrap());
    assert!(!doc.contains("pingmessage"));
    assert_eq!(doc.get_string_list("pingmessages"), vec!["hi"]);

    let migrated = doc.root().clone();
    assert!(!doc.migrate().unwrap());
    assert_eq!(doc.root(), &migrated);

    // The migration was persisted
    doc.reload().unwrap();
    assert_eq!(doc.root(), &migrated);
  }

  #[test]
  fn test_provision_writes_defaults_once() {
    let doc = ConfigDocument::provision(
      Box::new(MemoryBackend::new()),
      "maintenance-enabled: false\n",
    )
    .unwrap();
    assert!(doc.contains("maintenance-enabled"));
  }

  #[test]
  fn test_color_code_translation() {
    assert_eq!(translate_color_codes("&cRed &lbold"), "§cRed §lbold");
    assert_eq!(translate_color_codes("&Aupper"), "§aupper");
    assert_eq!(translate_color_codes("Tom & Jerry &"), "Tom & Jerry &");
    assert_eq!(translate_color_codes("&&a"), "&§a");
  }
}
