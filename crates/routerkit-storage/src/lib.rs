//! # RouterKit Storage
//!
//! Persistence collaborators for RouterKit: the on-disk program file store
//! and the SQLite-backed tool database.

pub mod files;
pub mod tools;

pub use files::FileStore;
pub use tools::ToolStore;
