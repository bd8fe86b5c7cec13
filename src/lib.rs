//! relay-bot: artifact-derived release lifecycle automation
//!
//! The bot never stores lifecycle state. Every invocation re-derives it
//! from repository artifacts (tags, branches, draft releases, the release
//! plan document), gates the incoming directive against that state and the
//! caller's permission tier, executes it, and reconciles the tracking
//! issue. See the module docs for the individual pieces:
//!
//! - [`release::state`]: the state derivation engine
//! - [`release::version`]: API version calculation from release history
//! - [`core::context`]: the unified context all consumers read
//! - [`commands::validate`]: descriptor-table command gating
//! - [`issue::sync`]: tracking-issue reconciliation and closure policy

pub mod commands;
pub mod core;
pub mod issue;
pub mod platform;
pub mod release;
