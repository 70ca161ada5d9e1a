//! Players allowed to join while maintenance is enabled.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::document::ConfigDocument;
use crate::error::{Result, StoreError};
use crate::models::{WhitelistEntry, parse_player_id, parse_player_name};

/// Persisted allow-list keyed by player UUID.
///
/// The backing document maps UUID strings to display names. All mutations
/// take one lock around both the in-memory entries and the document, so
/// concurrent add/remove calls are atomic read-modify-write operations.
pub struct AccessControlList {
  inner: Mutex<Inner>,
}

struct Inner {
  doc: ConfigDocument,
  entries: Vec<WhitelistEntry>,
}

impl AccessControlList {
  /// Build the list from a loaded whitelist document. Any key that is not a
  /// UUID, or value that is not a valid player name, fails the load.
  pub fn load(doc: ConfigDocument) -> Result<Self> {
    let entries = read_entries(doc.root())?;
    debug!(location = %doc.location(), count = entries.len(), "loaded whitelist");
    Ok(Self {
      inner: Mutex::new(Inner { doc, entries }),
    })
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Add a player. Returns `false` and changes nothing if the id is already
  /// present.
  pub fn add(&self, player_id: Uuid, display_name: &str) -> Result<bool> {
    let display_name = parse_player_name(display_name)?;

    let mut inner = self.lock();
    if inner.entries.iter().any(|e| e.player_id == player_id) {
      return Ok(false);
    }

    inner.entries.push(WhitelistEntry {
      player_id,
      display_name,
    });
    inner.doc.set(&player_id.to_string(), display_name.as_str());
    if let Err(e) = inner.doc.save() {
      warn!(error = %e, %player_id, "failed to save whitelist after add");
    }

    debug!(%player_id, name = %display_name, "whitelisted player");
    Ok(true)
  }

  /// Remove a player, returning whether an entry was found.
  pub fn remove(&self, player_id: Uuid) -> bool {
    let mut inner = self.lock();
    let Some(idx) = inner.entries.iter().position(|e| e.player_id == player_id) else {
      return false;
    };

    inner.entries.remove(idx);
    inner.doc.remove(&player_id.to_string());
    if let Err(e) = inner.doc.save() {
      warn!(error = %e, %player_id, "failed to save whitelist after remove");
    }

    debug!(%player_id, "removed player from whitelist");
    true
  }

  pub fn contains(&self, player_id: Uuid) -> bool {
    self.lock().entries.iter().any(|e| e.player_id == player_id)
  }

  /// Membership check for an id given as text.
  pub fn contains_str(&self, player_id: &str) -> Result<bool> {
    Ok(self.contains(parse_player_id(player_id)?))
  }

  /// Snapshot of all entries in insertion order.
  pub fn list_all(&self) -> Vec<WhitelistEntry> {
    self.lock().entries.clone()
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().entries.is_empty()
  }

  /// Re-read the backing document. On failure both the entries and the
  /// document keep their current contents.
  pub fn reload(&self) -> Result<()> {
    let mut inner = self.lock();
    let entries = inner.doc.reload_with(read_entries)?;
    inner.entries = entries;
    Ok(())
  }
}

fn read_entries(root: &Mapping) -> Result<Vec<WhitelistEntry>> {
  root
    .iter()
    .map(|(key, value)| {
      let key = key
        .as_str()
        .ok_or_else(|| StoreError::InvalidIdentifier(format!("{key:?}")))?;
      let name = match value {
        Value::String(s) => s.as_str(),
        other => {
          return Err(StoreError::Malformed(format!(
            "whitelist entry '{key}' has non-string name {other:?}"
          )));
        }
      };
      Ok(WhitelistEntry {
        player_id: parse_player_id(key)?,
        display_name: parse_player_name(name)?,
      })
    })
    .collect()
}
