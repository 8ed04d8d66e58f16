use crate::error::SimResult;
use crate::id::EntityId;
use crate::item::ItemGroup;
use crate::repository::{Entity, FieldValue};
use serde::{Deserialize, Serialize};

/// NPC firm that sells from an inexhaustible template group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalSupplier {
    pub id: EntityId,
    pub company_id: EntityId,
    pub item_id: String,
    /// Sales are cut from a copy of this group; the stored amount never shrinks.
    pub selling_item_template: ItemGroup,
}

impl LocalSupplier {
    pub fn new(company_id: EntityId, selling_item_template: ItemGroup) -> Self {
        Self {
            id: EntityId::generate(),
            company_id,
            item_id: selling_item_template.def.id.clone(),
            selling_item_template,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LocalSupplierPatch {
    pub selling_item_template: Option<ItemGroup>,
}

impl Entity for LocalSupplier {
    type Patch = LocalSupplierPatch;
    const ENTITY_TYPE: &'static str = "LocalSupplier";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => (&self.id).into(),
            "company_id" => (&self.company_id).into(),
            "item_id" => self.item_id.as_str().into(),
            _ => return None,
        })
    }

    fn apply_patch(&mut self, patch: LocalSupplierPatch) -> SimResult<()> {
        if let Some(template) = patch.selling_item_template {
            self.item_id = template.def.id.clone();
            self.selling_item_template = template;
        }
        Ok(())
    }
}
