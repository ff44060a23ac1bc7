//! Shared fixtures for specsafe tests
//!
//! - [`SpecWorkspace`]: a scratch specs root with helpers for writing
//!   namespace documents
//! - Sample documents ([`COMPLETE_DOCUMENT`], [`SPARSE_DOCUMENT`]) and
//!   [`document_with`] for building one section at a time
//! - Faulty [`DocumentIo`] writers for rollback tests

use specsafe_artifact::{atomic_write, read_string, DocumentIo, Error, Namespace, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Document that satisfies every section of the default rubric
pub const COMPLETE_DOCUMENT: &str = r"---
tier: standard
progress: 0.9
---
# Password Reset

## Executive Summary

Users who forget their password can request a reset link by email and choose a new password without contacting support.

## Problem Statement

Support handles roughly forty password tickets a week. Each one takes a human several minutes, users wait hours for a reply, and the manual process has no audit trail.

## User Stories

- As a user, I want to request a reset link so that I can regain access.
- As a user, I want the link to expire so that old emails are harmless.
- As an administrator, I want reset attempts logged so that abuse is visible.

## Functional Requirements

1. Accept a reset request by email address.
2. Send a single-use link valid for 30 minutes.
3. Require the new password to meet the strength policy.
4. Invalidate existing sessions after a reset.
5. Rate-limit requests per address and per IP.

## Non-Functional Requirements

- Reset email is sent within 10 seconds.
- Tokens are stored hashed.
- The endpoint sustains 50 requests per second.

## Technical Design

The reset flow is split between the web tier and a small token service so that token handling lives in one place and can be audited separately.

### Token Service

Issues random 32-byte tokens, stores their hash with an expiry, and consumes them exactly once.

### Email Dispatch

Queues a templated message through the existing mail relay and records the delivery id.

## Data Model

A `reset_tokens` table holds the token hash, the user id, the expiry time and a consumed flag indexed by hash.

## API Design

`POST /password-reset` accepts an email address; `POST /password-reset/confirm` accepts a token and a new password.

## Risks & Mitigations

- Risk: token leakage through referrer headers. Mitigation: no third-party assets on the reset page.
- Risk: email enumeration. Mitigation: identical responses for known and unknown addresses.

## Testing Strategy

Unit tests cover token issue and consumption.
Integration tests drive the full flow against a mail stub.
Expiry is tested with a fixed clock.
Rate limits are tested with a burst of requests.
A manual pass checks the email rendering.

## Success Metrics

- Password tickets drop by 80%.
- Median reset completes in under 3 minutes.
- No token reuse incidents in the first quarter.
";

/// Document with a title, metadata and only a few sections
pub const SPARSE_DOCUMENT: &str = r"---
tier: lite
progress: 25
---
# Search

## Executive Summary

Full-text search across projects.

## Technical Design

Use the existing index.
";

/// Filler text of exactly `chars` characters
#[must_use]
pub fn long_text(chars: usize) -> String {
    "Lorem ipsum dolor sit amet consectetur adipiscing elit "
        .chars()
        .cycle()
        .take(chars)
        .collect()
}

/// Build a document from `(heading, body)` pairs under a title
#[must_use]
pub fn document_with(title: &str, sections: &[(&str, &str)]) -> String {
    let mut out = format!("# {title}\n");
    for (heading, body) in sections {
        out.push_str(&format!("\n## {heading}\n\n{}\n", body.trim_end()));
    }
    out
}

/// Scratch specs root
#[derive(Debug)]
pub struct SpecWorkspace {
    dir: TempDir,
}

impl SpecWorkspace {
    /// Fresh empty root
    ///
    /// # Panics
    /// If the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Root path
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Parse a namespace key
    ///
    /// # Panics
    /// If `raw` is not a valid namespace.
    #[must_use]
    pub fn namespace(&self, raw: &str) -> Namespace {
        Namespace::new(raw).expect("valid namespace")
    }

    /// Write `<root>/<namespace>/<file>` and return its path
    ///
    /// # Panics
    /// If the write fails.
    pub fn write_document(&self, namespace: &str, file: &str, content: &str) -> PathBuf {
        let dir = self.root().join(namespace);
        fs::create_dir_all(&dir).expect("create namespace dir");
        let path = dir.join(file);
        fs::write(&path, content).expect("write document");
        path
    }

    /// Read a file under the root
    ///
    /// # Panics
    /// If the read fails.
    #[must_use]
    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).expect("read file")
    }
}

impl Default for SpecWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer that persists only the first `keep` bytes and then fails
///
/// Reads go to disk, so rollback code sees the damaged file.
#[derive(Debug, Clone, Copy)]
pub struct PartialWriteIo {
    /// Bytes written before the simulated failure
    pub keep: usize,
}

impl DocumentIo for PartialWriteIo {
    fn read(&self, path: &Path) -> Result<String> {
        read_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let cut = content
            .char_indices()
            .map(|(i, _)| i)
            .find(|&i| i >= self.keep)
            .unwrap_or(content.len());
        fs::write(path, &content[..cut]).map_err(|e| Error::io("write", path, e))?;
        Err(Error::io(
            "write",
            path,
            io::Error::new(io::ErrorKind::WriteZero, "simulated partial write"),
        ))
    }
}

/// Writer that reports success but appends stray bytes
#[derive(Debug, Default)]
pub struct CorruptingIo;

impl DocumentIo for CorruptingIo {
    fn read(&self, path: &Path) -> Result<String> {
        read_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        atomic_write(path, format!("{content}\n<!-- stray -->").as_bytes())
    }
}
