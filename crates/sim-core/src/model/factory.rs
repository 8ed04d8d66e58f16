use crate::catalog::FactoryProcess;
use crate::error::SimResult;
use crate::id::EntityId;
use crate::item::ItemStorage;
use crate::repository::{Entity, FieldValue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A manufacturing site owned by a company.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    pub id: EntityId,
    pub company_id: EntityId,
    /// Multiplies the process throughput.
    pub size: Decimal,
    pub storage: ItemStorage,
    /// Active recipe; `None` means the factory is idle.
    pub process: Option<FactoryProcess>,
}

impl Factory {
    pub fn new(company_id: EntityId, size: Decimal, storage: ItemStorage) -> Self {
        Self {
            id: EntityId::generate(),
            company_id,
            size,
            storage,
            process: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FactoryPatch {
    /// `Some(None)` clears the process.
    pub process: Option<Option<FactoryProcess>>,
}

impl Entity for Factory {
    type Patch = FactoryPatch;
    const ENTITY_TYPE: &'static str = "Factory";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => (&self.id).into(),
            "company_id" => (&self.company_id).into(),
            "size" => self.size.into(),
            "process_id" => self.process.as_ref().map(|p| p.id.clone()).into(),
            "storage_volume" => self.storage.volume().into(),
            _ => return None,
        })
    }

    fn apply_patch(&mut self, patch: FactoryPatch) -> SimResult<()> {
        if let Some(process) = patch.process {
            self.process = process;
        }
        Ok(())
    }
}
