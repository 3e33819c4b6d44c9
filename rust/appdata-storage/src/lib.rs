#![warn(missing_docs)]

//! This crate is the document store gateway for AppData: a hierarchical
//! key-value store whose entities are JSON property maps addressed by
//! [EntityKey]s.
//!
//! Select or implement a [TransactionalDocumentBackend] (for example
//! [MemoryDocumentBackend] or [FileSystemDocumentBackend]) and wrap it in a
//! [DocumentStore]:
//!
//! ```rust
//! use appdata_storage::{DocumentStore, MemoryDocumentBackend, UpdatePolicy};
//!
//! let store = DocumentStore::new(MemoryDocumentBackend::default())
//!     .with_policy(UpdatePolicy::MaxRetries(4));
//! ```
//!
//! Every read-modify-write issued through the [DocumentStore] runs as a
//! compare-and-swap [Transaction], so concurrent writers to one entity
//! serialize instead of losing updates.

mod error;
pub use error::*;

mod key;
pub use key::*;

mod entity;
pub use entity::*;

mod backend;
pub use backend::*;

mod transaction;
pub use transaction::*;

mod store;
pub use store::*;
