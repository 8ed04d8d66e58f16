use super::query::{execute, Query, QueryResult};
use super::Entity;
use crate::error::{SimError, SimResult};
use crate::id::EntityId;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

struct Row<E> {
    seq: u64,
    entity: E,
}

struct Store<E> {
    next_seq: u64,
    rows: BTreeMap<EntityId, Row<E>>,
}

impl<E: Entity> Store<E> {
    fn in_insertion_order(&self) -> Vec<&E> {
        let mut rows: Vec<&Row<E>> = self.rows.values().collect();
        rows.sort_by_key(|r| r.seq);
        rows.into_iter().map(|r| &r.entity).collect()
    }
}

/// In-memory store for one entity type.
///
/// Callers only ever see copies. Mutations happen under the store lock, so a
/// patch or a [`MemoryRepository::mutate`] closure is applied against the
/// authoritative value, never against a stale read.
pub struct MemoryRepository<E: Entity> {
    store: RwLock<Store<E>>,
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store {
                next_seq: 0,
                rows: BTreeMap::new(),
            }),
        }
    }

    fn read_store(&self) -> SimResult<RwLockReadGuard<'_, Store<E>>> {
        self.store
            .read()
            .map_err(|_| SimError::unexpected(format!("{} store lock poisoned", E::ENTITY_TYPE)))
    }

    fn write_store(&self) -> SimResult<RwLockWriteGuard<'_, Store<E>>> {
        self.store
            .write()
            .map_err(|_| SimError::unexpected(format!("{} store lock poisoned", E::ENTITY_TYPE)))
    }

    fn not_found(id: &EntityId) -> SimError {
        SimError::not_found(E::ENTITY_TYPE, id.as_str())
    }

    /// Store a copy of `entity`; fails with `Conflict` if the id is taken.
    pub async fn create(&self, entity: E) -> SimResult<E> {
        let mut store = self.write_store()?;
        if store.rows.contains_key(entity.id()) {
            return Err(SimError::conflict("entity with same id already exists.")
                .with_data(serde_json::json!({ "entityType": E::ENTITY_TYPE, "id": entity.id() })));
        }
        let seq = store.next_seq;
        store.next_seq += 1;
        trace!(entity_type = E::ENTITY_TYPE, id = %entity.id(), "create");
        store.rows.insert(
            entity.id().clone(),
            Row {
                seq,
                entity: entity.clone(),
            },
        );
        Ok(entity)
    }

    pub async fn read(&self, id: &EntityId) -> SimResult<E> {
        let store = self.read_store()?;
        store
            .rows
            .get(id)
            .map(|r| r.entity.clone())
            .ok_or_else(|| Self::not_found(id))
    }

    pub async fn exists(&self, id: &EntityId) -> SimResult<bool> {
        Ok(self.read_store()?.rows.contains_key(id))
    }

    pub async fn query(&self, query: &Query) -> SimResult<QueryResult<E>> {
        let store = self.read_store()?;
        execute(store.in_insertion_order(), query)
    }

    /// Apply a patch atomically and return the updated copy.
    ///
    /// A failing patch leaves the stored entity untouched.
    pub async fn update(&self, id: &EntityId, patch: E::Patch) -> SimResult<E> {
        let (updated, ()) = self.mutate(id, |e| e.apply_patch(patch)).await?;
        Ok(updated)
    }

    /// Run `f` on the stored entity under the store lock.
    ///
    /// `f` works on a scratch copy that is committed only when it returns `Ok`,
    /// which makes compound read-modify-write sequences (e.g. storage changes)
    /// race-free. Returns the committed copy and `f`'s output.
    pub async fn mutate<R>(
        &self,
        id: &EntityId,
        f: impl FnOnce(&mut E) -> SimResult<R>,
    ) -> SimResult<(E, R)> {
        let mut store = self.write_store()?;
        let row = store.rows.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        let mut scratch = row.entity.clone();
        let out = f(&mut scratch)?;
        if scratch.id() != id {
            return Err(SimError::unexpected("entity id changed during update"));
        }
        row.entity = scratch.clone();
        Ok((scratch, out))
    }

    pub async fn delete(&self, id: &EntityId) -> SimResult<()> {
        let mut store = self.write_store()?;
        store
            .rows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }

    pub async fn len(&self) -> SimResult<usize> {
        Ok(self.read_store()?.rows.len())
    }

    pub async fn is_empty(&self) -> SimResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Every entity in insertion order, for the persistence adapter.
    pub async fn snapshot(&self) -> SimResult<Vec<E>> {
        let store = self.read_store()?;
        Ok(store.in_insertion_order().into_iter().cloned().collect())
    }

    /// Replace the whole content with `entities`, keeping their order.
    pub async fn restore(&self, entities: Vec<E>) -> SimResult<()> {
        let mut rows = BTreeMap::new();
        let mut seq = 0;
        for entity in entities {
            let id = entity.id().clone();
            if rows.insert(id.clone(), Row { seq, entity }).is_some() {
                return Err(SimError::conflict(format!(
                    "duplicate {} id {id} in snapshot",
                    E::ENTITY_TYPE
                )));
            }
            seq += 1;
        }
        let mut store = self.write_store()?;
        store.rows = rows;
        store.next_seq = seq;
        Ok(())
    }
}
