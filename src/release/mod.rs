//! Release lifecycle model and state derivation
//!
//! # Core Invariants
//!
//! 1. **State is derived, never stored**
//!    - Tags, branches, draft releases, and the release plan document are
//!      the only source of truth
//!    - Every invocation re-derives from scratch; no cross-invocation cache
//!    - Manual artifact edits are therefore always reflected
//!
//! 2. **One authoritative state per instant**
//!    - Precedence: published tag > snapshot branch (with/without draft) >
//!      plan document
//!    - Configuration errors are a failure mode, not a state
//!
//! 3. **Version extensions are strictly increasing and gap-free**
//!    - Pre-release cuts of the same (api, version, status) tuple get
//!      consecutive extensions; a duplicate in history is a hard failure

pub mod metadata;
pub mod plan;
pub mod state;
pub mod version;

pub use metadata::ReleaseMetadata;
pub use plan::{ApiStatus, ApiTarget, ReleasePlan, ReleaseType};
pub use state::{Derived, ReleaseFacts, ReleaseState, SnapshotInfo, StateEngine};
