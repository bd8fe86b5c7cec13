//! Core engine for relbot
//!
//! - **config**: bot.toml parsing with full defaults
//! - **context**: the unified BotContext every consumer reads
//! - **error**: error taxonomy with exit codes and contextual help
//! - **queue**: per-repository serialized work queue
//! - **retry**: bounded backoff for transient platform I/O

pub mod config;
pub mod context;
pub mod error;
pub mod queue;
pub mod retry;
