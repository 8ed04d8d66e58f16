use super::check_unit_price;
use crate::error::{SimError, SimResult};
use crate::id::EntityId;
use crate::item::ItemStorage;
use crate::repository::{Entity, FieldValue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A retail listing: which item group a shop sells and at what price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleEntry {
    pub item_id: String,
    pub item_group_id: EntityId,
    pub price: Decimal,
}

/// A retail outlet owned by a company.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: EntityId,
    pub company_id: EntityId,
    pub size: Decimal,
    pub storage: ItemStorage,
    pub selling: Vec<SaleEntry>,
}

impl Shop {
    pub fn new(company_id: EntityId, size: Decimal, storage: ItemStorage) -> Self {
        Self {
            id: EntityId::generate(),
            company_id,
            size,
            storage,
            selling: Vec::new(),
        }
    }

    /// Every sale entry must point at a distinct group of the same item type in storage.
    pub fn validate_selling(&self, selling: &[SaleEntry]) -> SimResult<()> {
        let mut listed = BTreeSet::new();
        for entry in selling {
            if !listed.insert(&entry.item_group_id) {
                return Err(SimError::invalid(format!(
                    "item group {} is listed more than once",
                    entry.item_group_id
                )));
            }
            let group = self.storage.item_group(&entry.item_group_id)?;
            if group.def.id != entry.item_id {
                return Err(SimError::invalid(format!(
                    "sale entry item {} does not match item group {} holding {}",
                    entry.item_id, entry.item_group_id, group.def.id
                )));
            }
            check_unit_price(entry.price)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ShopPatch {
    pub selling: Option<Vec<SaleEntry>>,
}

impl Entity for Shop {
    type Patch = ShopPatch;
    const ENTITY_TYPE: &'static str = "Shop";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => (&self.id).into(),
            "company_id" => (&self.company_id).into(),
            "size" => self.size.into(),
            "storage_volume" => self.storage.volume().into(),
            _ => return None,
        })
    }

    fn apply_patch(&mut self, patch: ShopPatch) -> SimResult<()> {
        if let Some(selling) = patch.selling {
            self.validate_selling(&selling)?;
            self.selling = selling;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemDefinition, ItemGroup};

    #[test]
    fn selling_must_reference_matching_group() {
        let mut storage = ItemStorage::new(Decimal::from(10));
        let def = ItemDefinition::new("watch", Decimal::new(1, 2), Decimal::from(30));
        let gid = storage
            .add_item_group(ItemGroup::new(def, Decimal::from(5)))
            .unwrap();
        let mut shop = Shop::new("c".into(), Decimal::ONE, storage);

        let ok = vec![SaleEntry { item_id: "watch".into(), item_group_id: gid.clone(), price: Decimal::from(25) }];
        shop.apply_patch(ShopPatch { selling: Some(ok) }).unwrap();
        assert_eq!(shop.selling.len(), 1);

        let wrong_item = vec![SaleEntry { item_id: "goldRing".into(), item_group_id: gid.clone(), price: Decimal::ONE }];
        assert!(shop.validate_selling(&wrong_item).is_err());

        let missing = vec![SaleEntry { item_id: "watch".into(), item_group_id: "nope".into(), price: Decimal::ONE }];
        assert!(shop.validate_selling(&missing).unwrap_err().is_not_found());

        let overpriced = vec![SaleEntry { item_id: "watch".into(), item_group_id: gid.clone(), price: Decimal::MAX }];
        assert!(shop.validate_selling(&overpriced).is_err());
    }

    #[test]
    fn one_listing_per_item_group() {
        let mut storage = ItemStorage::new(Decimal::from(10));
        let def = ItemDefinition::new("goldRing", Decimal::new(1, 2), Decimal::from(300));
        let gid = storage
            .add_item_group(ItemGroup::new(def, Decimal::from(10)))
            .unwrap();
        let mut shop = Shop::new("c".into(), Decimal::ONE, storage);

        let entry = SaleEntry { item_id: "goldRing".into(), item_group_id: gid, price: Decimal::from(100) };
        let twice = vec![entry.clone(), entry];
        let err = shop
            .apply_patch(ShopPatch { selling: Some(twice) })
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidOperation { .. }));
        assert!(shop.selling.is_empty());
    }
}
