//! # Storage Module
//!
//! Transactional row storage on top of the redb embedded database.
//!
//! Uses redb for:
//! - ACID transactions (a failed service call leaves no partial writes)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Each entity lives in its own table keyed by `u64` with a postcard-encoded
//! row as the value. Relationships are plain foreign-key ids resolved by the
//! services.

mod redb_store;

pub use redb_store::{ReadTx, Reader, Record, Store, TableCount, WriteTx};
