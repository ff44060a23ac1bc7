//! Specsafe Artifact Foundation
//!
//! Shared building blocks for every specsafe component.
//!
//! # Core Concepts
//!
//! - [`ContentHash`]: 32-byte BLAKE3 digest used to verify snapshots
//! - [`Namespace`]: validated key scoping counters, documents and snapshots
//! - [`NamespaceLock`]: cross-process exclusive lock with a bounded wait
//! - [`atomic_write`]: temp-file-then-rename persistence
//! - [`SectionMap`] / [`DocumentMetadata`]: the parsed view of a spec document
//! - [`DocumentLocator`]: injected "current document for namespace" lookup
//! - [`Error`]: the shared error kinds (not found, integrity, validation,
//!   concurrency, io)
//!
//! # Example
//!
//! ```rust,ignore
//! use specsafe_artifact::{ContentHash, SectionMap, DocumentMetadata};
//!
//! let content = std::fs::read_to_string("specs/auth/spec-1.md")?;
//! let hash = ContentHash::compute(content.as_bytes());
//! let meta = DocumentMetadata::parse(&content);
//! let sections = SectionMap::parse(&content);
//! println!("{} tier={} sections={}", hash.short(), meta.tier_or_default(), sections.len());
//! ```

#![warn(unreachable_pub)]

pub mod document;
mod error;
mod fsio;
mod hash;
mod locator;
mod lock;
mod namespace;

pub use document::{DocumentMetadata, Section, SectionMap};
pub use error::{Error, ErrorKind, Result};
pub use fsio::{atomic_write, read_string, remove_file, AtomicFileIo, DocumentIo};
pub use hash::{ContentHash, HashError};
pub use locator::{DirectoryLocator, DocumentLocator, DOCUMENT_PREFIX};
pub use lock::{LockOptions, NamespaceLock};
pub use namespace::{Namespace, MAX_NAMESPACE_LEN};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
