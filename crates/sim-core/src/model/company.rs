use crate::error::SimResult;
use crate::id::EntityId;
use crate::repository::{Entity, FieldUpdate, FieldValue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A player or NPC company.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: EntityId,
    pub name: String,
    /// Cash balance. Only the unconditional withdrawal path may drive it negative.
    pub cash: Decimal,
}

impl Company {
    pub fn new(name: impl Into<String>, cash: Decimal) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.into(),
            cash,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CompanyPatch {
    pub cash: Option<FieldUpdate<Decimal>>,
}

impl Entity for Company {
    type Patch = CompanyPatch;
    const ENTITY_TYPE: &'static str = "Company";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => (&self.id).into(),
            "name" => self.name.as_str().into(),
            "cash" => self.cash.into(),
            _ => return None,
        })
    }

    fn apply_patch(&mut self, patch: CompanyPatch) -> SimResult<()> {
        if let Some(cash) = patch.cash {
            cash.apply(&mut self.cash)?;
        }
        Ok(())
    }
}
