//! # Model Module
//!
//! Stored rows and the client-facing views derived from them.
//!
//! Stored rows are encoded with postcard, so they carry no serde skip
//! attributes; anything that should be hidden from clients (password hashes,
//! private profile fields) is dropped when building a view instead.

mod announcement;
mod study;
mod team;
mod user;

pub use announcement::*;
pub use study::*;
pub use team::*;
pub use user::*;

use crate::storage::{Record, Store};
use crate::Result;
use std::path::Path;

/// Every row table, in the order `status` reports them.
pub const TABLES: &[&str] = &[
    User::TABLE,
    Announcement::TABLE,
    Team::TABLE,
    TeamRole::TABLE,
    TeamMember::TABLE,
    Study::TABLE,
    StudyRole::TABLE,
    Progress::TABLE,
    Resource::TABLE,
];

/// Open the platform database at `path`, creating missing tables.
pub fn open_store(path: impl AsRef<Path>) -> Result<Store> {
    Store::open(path, TABLES)
}

/// A fresh in-memory platform database.
pub fn memory_store() -> Result<Store> {
    Store::in_memory(TABLES)
}

/// `{"success": true}` acknowledgement body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub const OK: Self = Self { success: true };
}

/// `{"success": true, "id": ...}` acknowledgement for creations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Created<I> {
    pub success: bool,
    pub id: I,
}

impl<I> Created<I> {
    pub fn new(id: I) -> Self {
        Self { success: true, id }
    }
}
