//! Versioned element snapshots, staleness detection, and sensitive-action
//! flagging.
//!
//! The ref manager is the bridge between observed DOM state and the
//! interpreter: every element the interpreter or a planner addresses is
//! named by a [`snapshot::VersionedRef`] (`"version:ref"`), and the only
//! ref that is ever valid is one pointing at the current snapshot version.

pub mod identity;
pub mod sensitive;
pub mod snapshot;

pub use identity::IdentityHash;
pub use sensitive::{find_sensitive_elements, is_sensitive, SensitivityCheck};
pub use snapshot::{
    Element, RefError, RefManager, RefValidation, Snapshot, VersionedRef, DEFAULT_HISTORY_LIMIT,
};
