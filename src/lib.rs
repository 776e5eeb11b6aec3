//! mention-relay client library.
//!
//! Text transformation for a multi-recipient chat client: markdown-subset
//! rendering, `@mention` parsing, cursor-driven autocomplete, and per-recipient
//! dispatch. The terminal binary in `main.rs` is a thin adapter over these.

pub mod autocomplete;
pub mod backend;
pub mod commands;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod escape;
pub mod lifecycle;
pub mod logging;
pub mod markdown;
pub mod mention;
pub mod presentation;
pub mod protocol;
pub mod session;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
