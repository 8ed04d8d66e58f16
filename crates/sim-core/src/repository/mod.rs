//! Generic per-entity-type store.
//!
//! Every persisted object implements [`Entity`]. A [`MemoryRepository`] holds
//! one entity type, hands out deep copies only, and supports filtered/sorted
//! queries plus patch updates whose numeric fields may be atomic deltas.

mod memory;
mod query;

pub use memory::MemoryRepository;
pub use query::{Filter, FilterOp, Query, QueryResult, SortKey, DEFAULT_QUERY_LIMIT};

use crate::error::{SimError, SimResult};
use crate::id::EntityId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A value exposed to the query engine.
///
/// Ordering is by variant first, so `Null` sorts before everything else.
/// Decimals compare by value (`1.0 == 1.00`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Decimal(Decimal),
    Date(NaiveDate),
    Str(String),
}

impl From<Decimal> for FieldValue {
    fn from(v: Decimal) -> Self {
        FieldValue::Decimal(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Decimal(Decimal::from(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        FieldValue::Date(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<&EntityId> for FieldValue {
    fn from(v: &EntityId) -> Self {
        FieldValue::Str(v.0.clone())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

/// Assignment carried by a patch.
///
/// `Delta` is added to the value stored at the moment the patch is applied,
/// so concurrent deltas never lose each other. `Set` overwrites and is racy
/// when callers use it to accumulate.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldUpdate<T> {
    Set(T),
    Delta(T),
}

impl FieldUpdate<Decimal> {
    pub fn apply(self, slot: &mut Decimal) -> SimResult<()> {
        match self {
            FieldUpdate::Set(v) => *slot = v,
            FieldUpdate::Delta(d) => {
                *slot = slot
                    .checked_add(d)
                    .ok_or_else(|| SimError::invalid("numeric overflow in delta update"))?;
            }
        }
        Ok(())
    }
}

/// A persisted object stored in a [`MemoryRepository`].
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Partial update understood by [`Entity::apply_patch`].
    type Patch: Send;

    /// Type tag used in errors and by the persistence adapter.
    const ENTITY_TYPE: &'static str;

    fn id(&self) -> &EntityId;

    /// Query-visible field by name; `None` when the field does not exist.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Apply a patch in place. On error the caller discards the entity.
    fn apply_patch(&mut self, patch: Self::Patch) -> SimResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_first_and_decimals_by_value() {
        assert!(FieldValue::Null < FieldValue::Decimal(Decimal::new(-5, 0)));
        assert_eq!(
            FieldValue::Decimal(Decimal::new(10, 1)),
            FieldValue::Decimal(Decimal::new(100, 2))
        );
        assert!(FieldValue::from(Decimal::new(3, 0)) > FieldValue::from(Decimal::new(25, 1)));
    }

    #[test]
    fn delta_adds_to_current_value() {
        let mut v = Decimal::new(10, 0);
        FieldUpdate::Delta(Decimal::new(-3, 0)).apply(&mut v).unwrap();
        assert_eq!(v, Decimal::new(7, 0));
        FieldUpdate::Set(Decimal::ONE).apply(&mut v).unwrap();
        assert_eq!(v, Decimal::ONE);
    }

    #[test]
    fn delta_overflow_is_rejected() {
        let mut v = Decimal::MAX;
        let err = FieldUpdate::Delta(Decimal::MAX).apply(&mut v).unwrap_err();
        assert!(matches!(err, SimError::InvalidOperation { .. }));
        assert_eq!(v, Decimal::MAX);
    }
}
