//! Persistence for the maintenance service: typed configuration documents
//! over pluggable storage, and the whitelist built on top of them.

mod backend;
mod document;
mod error;
mod models;
mod whitelist;

pub use backend::{FileBackend, MemoryBackend, SqliteBackend, StorageBackend, parse_document};
pub use document::{COLOR_ESCAPE, ConfigDocument, SECTION_SIGN, translate_color_codes};
pub use error::{Result, StoreError};
pub use models::{PlayerName, WhitelistEntry, parse_player_id, parse_player_name};
pub use whitelist::AccessControlList;
