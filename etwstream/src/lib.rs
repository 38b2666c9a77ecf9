// src/lib.rs
// ────────────────────────────────────────────────────────────────────────────
// Public library entry point.  Re-export everything for both `main.rs` and
// integration tests.

pub mod config;
pub mod host;
pub mod pipeline;
pub mod session;
pub mod source;

mod macros;
