//! # STCE Core
//!
//! Domain model and services for the STCE club platform.
//!
//! Everything here is synchronous. Each service owns a shared [`Store`] and
//! runs every multi-step operation inside one redb write transaction, so a
//! failed step leaves nothing behind. The app crate wraps these calls in
//! `spawn_blocking` and maps [`StceError`] to HTTP statuses.
//!
//! ## Modules
//!
//! - [`auth`]: registration, login, token authentication
//! - [`members`]: public member directory
//! - [`admin`]: member search, update and removal
//! - [`announcements`]: published notices with view counting
//! - [`teams`]: team recruitment posts, roles and applications
//! - [`study`]: study groups, membership, progress and resources

pub mod admin;
pub mod announcements;
pub mod auth;
pub mod error;
pub mod members;
pub mod model;
pub mod password;
pub mod primitives;
pub mod storage;
pub mod study;
pub mod teams;
pub mod token;
pub mod validate;

pub use auth::{Actor, AuthResponse, AuthService};
pub use error::{Result, StceError};
pub use model::{Created, Success, memory_store, open_store};
pub use password::{Hasher, PasswordCost};
pub use primitives::*;
pub use storage::{Reader, Store, TableCount};
pub use token::{Claims, TokenSigner};
pub use validate::Validate;
