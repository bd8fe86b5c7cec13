//! Integration tests driving the core through the in-memory platform
//!
//! Each test builds an artifact snapshot with FakePlatform, runs the real
//! derivation/validation/handler/sync code against it, and asserts on both
//! the returned values and the resulting artifact state.

mod helpers;
mod test_commands;
mod test_issue_sync;
mod test_state;
