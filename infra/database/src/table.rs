use crate::{DatabaseError, Record, query};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use topo_domain::models::{Condition, ScopeTag};

/// Rows of one table, ordered by id. Only reachable inside [`Table::read`]/[`Table::write`],
/// so every closure runs atomically with respect to other operations on the same table.
#[derive(Debug)]
pub struct Rows<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T: Record> Rows<T> {
    pub fn get(&self, id: i64) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.rows.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    /// Rows visible under `scope`.
    pub fn visible<'a>(&'a self, scope: Option<&'a ScopeTag>) -> impl Iterator<Item = &'a T> {
        self.rows.values().filter(move |row| ScopeTag::is_visible(row.scope(), scope))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Assigns the next id and stores the row.
    pub fn insert(&mut self, mut row: T) -> T {
        self.last_id += 1;
        row.assign_id(self.last_id);
        self.rows.insert(self.last_id, row.clone());
        row
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        self.rows.remove(&id)
    }

    /// Filter, sort and paginate the rows visible under `scope`.
    pub fn select(
        &self,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Vec<T>, DatabaseError> {
        query::select(self.visible(scope), condition)
    }
}

/// A table guarded by one `RwLock`.
#[derive(Debug)]
pub struct Table<T> {
    rows: RwLock<Rows<T>>,
    online: Arc<AtomicBool>,
}

impl<T: Record> Table<T> {
    pub(crate) fn new(online: Arc<AtomicBool>) -> Self {
        Self { rows: RwLock::new(Rows { rows: BTreeMap::new(), last_id: 0 }), online }
    }

    pub fn read<R>(
        &self,
        op: impl FnOnce(&Rows<T>) -> Result<R, DatabaseError>,
    ) -> Result<R, DatabaseError> {
        self.ensure_online()?;
        op(&self.rows.read())
    }

    pub fn write<R>(
        &self,
        op: impl FnOnce(&mut Rows<T>) -> Result<R, DatabaseError>,
    ) -> Result<R, DatabaseError> {
        self.ensure_online()?;
        op(&mut self.rows.write())
    }

    fn ensure_online(&self) -> Result<(), DatabaseError> {
        if self.online.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(DatabaseError::Connection {
                message: "engine is shut down".into(),
                context: Some(T::TABLE.into()),
            })
        }
    }
}
