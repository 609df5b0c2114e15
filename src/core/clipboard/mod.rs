//! Scoped clipboard system: types (C7), SQLite storage (C8), the
//! permission-aware manager (C9), prompt-injection formatting (C10), and
//! JSON export/import (§6.2).

pub mod export;
pub mod injection;
pub mod manager;
pub mod storage;
pub mod types;

pub use export::{export_entries, import_entries, ConflictPolicy, ExportDocument, ExportError, ExportedEntry, ImportReport};
pub use injection::{format_clipboard_context, format_entry_detail, format_time_ago};
pub use manager::{ClipboardError, ClipboardManager, ClipboardTtlConfig};
pub use storage::{ClipboardStorage, StorageError};
pub use types::{
    ClipboardEntry, ClipboardPermissions, ClipboardScope, ClipboardTag, FromContentOptions, InsertionMode,
    MAX_ENTRY_SIZE_BYTES, WARN_ENTRY_SIZE_BYTES,
};
