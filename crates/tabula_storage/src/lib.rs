//! # Tabula Storage
//!
//! Document storage backends for Tabula.
//!
//! A backend stores **opaque byte documents** under short relative names
//! such as `metadata.json` or `rows/users.json`. It never interprets the
//! bytes; the engine owns every document format.
//!
//! ## Design Principles
//!
//! - A write replaces the whole document
//! - Reading an absent document yields `None`, not an error
//! - Backends are `Send + Sync` and lock internally
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral databases
//! - [`FileBackend`] - One directory per database, atomic replace on write
//!
//! ## Example
//!
//! ```rust
//! use tabula_storage::{StorageBackend, InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.write("metadata.json", b"{}").unwrap();
//! assert_eq!(backend.read("metadata.json").unwrap(), Some(b"{}".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{validate_document_name, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
