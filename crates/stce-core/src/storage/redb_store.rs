//! redb-backed row store.

use crate::error::Result;
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Row tables: `id -> postcard(row)`.
type RowTable<'a> = TableDefinition<'a, u64, &'static [u8]>;

/// Last id handed out per table.
const SEQUENCES: TableDefinition<'static, &'static str, u64> = TableDefinition::new("sequences");

// =============================================================================
// RECORD TRAIT
// =============================================================================

/// A row type stored in its own table.
pub trait Record: Serialize + DeserializeOwned {
    /// Typed primary key.
    type Id: Copy + Into<u64> + From<u64>;

    /// Table (and sequence) name.
    const TABLE: &'static str;

    fn id(&self) -> Self::Id;

    fn table() -> RowTable<'static> {
        TableDefinition::new(Self::TABLE)
    }
}

fn encode<R: Record>(row: &R) -> Result<Vec<u8>> {
    Ok(postcard::to_stdvec(row)?)
}

fn decode<R: Record>(bytes: &[u8]) -> Result<R> {
    Ok(postcard::from_bytes(bytes)?)
}

fn get_row<R, T>(table: &T, id: R::Id) -> Result<Option<R>>
where
    R: Record,
    T: ReadableTable<u64, &'static [u8]>,
{
    let key: u64 = id.into();
    match table.get(key)? {
        Some(guard) => Ok(Some(decode(guard.value())?)),
        None => Ok(None),
    }
}

fn scan_rows<R, T>(table: &T) -> Result<Vec<R>>
where
    R: Record,
    T: ReadableTable<u64, &'static [u8]>,
{
    let mut rows = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        rows.push(decode(value.value())?);
    }
    Ok(rows)
}

// =============================================================================
// READER TRAIT
// =============================================================================

/// Read access shared by read and write transactions.
///
/// Scans return rows in ascending id order, which is also insertion order.
pub trait Reader {
    fn get<R: Record>(&self, id: R::Id) -> Result<Option<R>>;

    fn scan<R: Record>(&self) -> Result<Vec<R>>;

    /// All rows matching `pred`.
    fn find<R: Record>(&self, pred: impl Fn(&R) -> bool) -> Result<Vec<R>> {
        Ok(self.scan::<R>()?.into_iter().filter(|row| pred(row)).collect())
    }

    /// First row (lowest id) matching `pred`.
    fn find_first<R: Record>(&self, pred: impl Fn(&R) -> bool) -> Result<Option<R>> {
        Ok(self.scan::<R>()?.into_iter().find(|row| pred(row)))
    }

    fn exists<R: Record>(&self, id: R::Id) -> Result<bool> {
        Ok(self.get::<R>(id)?.is_some())
    }
}

/// A read-only snapshot.
pub struct ReadTx {
    txn: ReadTransaction,
}

impl Reader for ReadTx {
    fn get<R: Record>(&self, id: R::Id) -> Result<Option<R>> {
        let table = self.txn.open_table(R::table())?;
        get_row(&table, id)
    }

    fn scan<R: Record>(&self) -> Result<Vec<R>> {
        let table = self.txn.open_table(R::table())?;
        scan_rows(&table)
    }
}

/// A write transaction. Dropped without commit means aborted.
pub struct WriteTx {
    txn: WriteTransaction,
}

impl Reader for WriteTx {
    fn get<R: Record>(&self, id: R::Id) -> Result<Option<R>> {
        let table = self.txn.open_table(R::table())?;
        get_row(&table, id)
    }

    fn scan<R: Record>(&self) -> Result<Vec<R>> {
        let table = self.txn.open_table(R::table())?;
        scan_rows(&table)
    }
}

impl WriteTx {
    /// Allocate the next id for `table`. Ids are never reused.
    fn next_id(&self, table: &str) -> Result<u64> {
        let mut sequences = self.txn.open_table(SEQUENCES)?;
        let last = sequences.get(table)?.map(|guard| guard.value()).unwrap_or(0);
        let next = last.saturating_add(1);
        sequences.insert(table, next)?;
        Ok(next)
    }

    /// Insert a new row; `build` receives the freshly allocated id.
    pub fn insert<R: Record>(&self, build: impl FnOnce(R::Id) -> R) -> Result<R> {
        let id = R::Id::from(self.next_id(R::TABLE)?);
        let row = build(id);
        self.put(&row)?;
        Ok(row)
    }

    /// Insert or overwrite the row stored under `row.id()`.
    pub fn put<R: Record>(&self, row: &R) -> Result<()> {
        let bytes = encode(row)?;
        let key: u64 = row.id().into();
        let mut table = self.txn.open_table(R::table())?;
        table.insert(key, bytes.as_slice())?;
        Ok(())
    }

    /// Remove a row. Returns whether it existed.
    pub fn remove<R: Record>(&self, id: R::Id) -> Result<bool> {
        let key: u64 = id.into();
        let mut table = self.txn.open_table(R::table())?;
        let removed = table.remove(key)?.is_some();
        Ok(removed)
    }

    /// Remove every row matching `pred`, returning the removed rows.
    pub fn remove_where<R: Record>(&self, pred: impl Fn(&R) -> bool) -> Result<Vec<R>> {
        let doomed = self.find::<R>(pred)?;
        for row in &doomed {
            self.remove::<R>(row.id())?;
        }
        Ok(doomed)
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Row count for one table (used by `status`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: usize,
}

/// Handle to the database. Cheap to share behind an `Arc`.
pub struct Store {
    db: Database,
    tables: &'static [&'static str],
}

impl Store {
    /// Open (or create) a database file and make sure every table exists.
    pub fn open(path: impl AsRef<Path>, tables: &'static [&'static str]) -> Result<Self> {
        let db = Database::create(path)?;
        Self::init(db, tables)
    }

    /// A throwaway database held entirely in memory.
    pub fn in_memory(tables: &'static [&'static str]) -> Result<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db, tables)
    }

    fn init(db: Database, tables: &'static [&'static str]) -> Result<Self> {
        let store = Self { db, tables };
        store.write(|tx| {
            tx.txn.open_table(SEQUENCES)?;
            for name in tables {
                tx.txn.open_table(RowTable::new(name))?;
            }
            Ok(())
        })?;
        Ok(store)
    }

    /// Run `f` against a consistent snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&ReadTx) -> Result<T>) -> Result<T> {
        let tx = ReadTx {
            txn: self.db.begin_read()?,
        };
        f(&tx)
    }

    /// Run `f` in a write transaction: committed when `f` returns `Ok`,
    /// aborted (nothing written) when it returns `Err`.
    pub fn write<T>(&self, f: impl FnOnce(&WriteTx) -> Result<T>) -> Result<T> {
        let tx = WriteTx {
            txn: self.db.begin_write()?,
        };
        let value = f(&tx)?;
        tx.txn.commit()?;
        Ok(value)
    }

    /// Row counts for every registered table.
    pub fn counts(&self) -> Result<Vec<TableCount>> {
        let tables = self.tables;
        self.read(|tx| {
            let mut counts = Vec::with_capacity(tables.len());
            for &name in tables {
                let table = tx.txn.open_table(RowTable::new(name))?;
                let mut rows = 0usize;
                for entry in table.iter()? {
                    entry?;
                    rows = rows.saturating_add(1);
                }
                counts.push(TableCount { table: name, rows });
            }
            Ok(counts)
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::error::StceError;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u64,
        text: String,
    }

    impl Record for Note {
        type Id = u64;
        const TABLE: &'static str = "notes";

        fn id(&self) -> u64 {
            self.id
        }
    }

    const TABLES: &[&str] = &["notes"];

    fn note(text: &str) -> impl FnOnce(u64) -> Note + '_ {
        move |id| Note {
            id,
            text: text.to_string(),
        }
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let store = Store::in_memory(TABLES).unwrap();
        let a = store.write(|tx| tx.insert(note("a"))).unwrap();
        let b = store.write(|tx| tx.insert(note("b"))).unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let all: Vec<Note> = store.read(|tx| tx.scan()).unwrap();
        assert_eq!(all, vec![a, b]);
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let store = Store::in_memory(TABLES).unwrap();
        let result: Result<()> = store.write(|tx| {
            tx.insert(note("doomed"))?;
            Err(StceError::bad_request("nope"))
        });
        assert!(result.is_err());

        let all: Vec<Note> = store.read(|tx| tx.scan()).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn ids_are_not_reused_after_remove() {
        let store = Store::in_memory(TABLES).unwrap();
        let first = store.write(|tx| tx.insert(note("x"))).unwrap();
        assert!(store.write(|tx| tx.remove::<Note>(first.id)).unwrap());
        assert!(!store.write(|tx| tx.remove::<Note>(first.id)).unwrap());

        let second = store.write(|tx| tx.insert(note("y"))).unwrap();
        assert_eq!(second.id, 2);
    }

    #[test]
    fn remove_where_returns_removed_rows() {
        let store = Store::in_memory(TABLES).unwrap();
        store
            .write(|tx| {
                tx.insert(note("keep"))?;
                tx.insert(note("drop"))?;
                tx.insert(note("drop"))?;
                Ok(())
            })
            .unwrap();

        let removed = store
            .write(|tx| tx.remove_where::<Note>(|n| n.text == "drop"))
            .unwrap();
        assert_eq!(removed.len(), 2);

        let counts = store.counts().unwrap();
        assert_eq!(counts, vec![TableCount { table: "notes", rows: 1 }]);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.redb");
        {
            let store = Store::open(&path, TABLES).unwrap();
            store.write(|tx| tx.insert(note("kept"))).unwrap();
        }
        let store = Store::open(&path, TABLES).unwrap();
        let found: Option<Note> = store.read(|tx| tx.get(1)).unwrap();
        assert_eq!(found.map(|n| n.text), Some("kept".to_string()));
    }
}
