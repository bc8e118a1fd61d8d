//! PolicyDesk storage crate - the local mirror of the document list.
//!
//! Provides a synchronous key-value blob store (SQLite-backed or in-memory)
//! and the typed document mirror the registry reads at startup and rewrites
//! on every change.

pub mod blob;
pub mod db;
pub mod migrations;
pub mod mirror;

pub use blob::{BlobStore, MemoryBlobStore};
pub use db::Database;
pub use mirror::DocumentMirror;
