//! Items, item groups and the volume-bounded storage owned by firms.

use crate::error::{SimError, SimResult};
use crate::id::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Static definition of an item type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Item type id, e.g. "gold".
    pub id: String,
    /// Volume occupied by one unit.
    pub volume: Decimal,
    /// Reference price of one unit.
    pub base_price: Decimal,
}

impl ItemDefinition {
    pub fn new(id: impl Into<String>, volume: Decimal, base_price: Decimal) -> Self {
        Self {
            id: id.into(),
            volume,
            base_price,
        }
    }
}

/// A fungible batch of one item type.
///
/// `group_id` is a stable handle: supply entries and sale entries refer to it,
/// so it must survive merges and partial takes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemGroup {
    pub group_id: EntityId,
    pub def: ItemDefinition,
    pub amount: Decimal,
}

impl ItemGroup {
    /// New group with a freshly generated id.
    pub fn new(def: ItemDefinition, amount: Decimal) -> Self {
        Self::with_id(EntityId::generate(), def, amount)
    }

    pub fn with_id(group_id: EntityId, def: ItemDefinition, amount: Decimal) -> Self {
        Self {
            group_id,
            def,
            amount,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.def.id
    }

    /// Total volume of the batch.
    pub fn volume(&self) -> Decimal {
        self.def.volume * self.amount
    }

    /// Two groups can merge iff they hold the same item type.
    pub fn is_compatible(&self, other: &ItemGroup) -> bool {
        self.def.id == other.def.id
    }

    /// Merge `other` into this group, keeping this group's id.
    pub fn merge(&mut self, other: &ItemGroup) -> SimResult<()> {
        if !self.is_compatible(other) {
            return Err(SimError::invalid("incompatible item group to merge").with_data(json!({
                "target": self.def.id,
                "other": other.def.id,
            })));
        }
        self.amount += other.amount;
        Ok(())
    }

    /// Split `amount` units off into a new group with a fresh id.
    pub fn take(&mut self, amount: Decimal) -> SimResult<ItemGroup> {
        if amount < Decimal::ZERO {
            return Err(SimError::invalid("cannot take a negative amount of items"));
        }
        if amount > self.amount {
            return Err(SimError::invalid("insufficient amount of items in item group").with_data(
                json!({
                    "groupId": self.group_id,
                    "requested": amount.to_string(),
                    "available": self.amount.to_string(),
                }),
            ));
        }
        self.amount -= amount;
        Ok(ItemGroup::new(self.def.clone(), amount))
    }
}

/// Volume-bounded container of item groups.
///
/// Empty groups are kept: other entities hold their ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemStorage {
    pub max_volume: Decimal,
    items: Vec<ItemGroup>,
}

impl ItemStorage {
    /// Empty storage.
    pub fn new(max_volume: Decimal) -> Self {
        Self {
            max_volume,
            items: Vec::new(),
        }
    }

    /// Storage pre-filled with `items`; fails if they do not fit.
    pub fn with_items(max_volume: Decimal, items: Vec<ItemGroup>) -> SimResult<Self> {
        let storage = Self { max_volume, items };
        if storage.volume() > storage.max_volume {
            return Err(SimError::invalid("max storage volume exceeded"));
        }
        Ok(storage)
    }

    pub fn items(&self) -> &[ItemGroup] {
        &self.items
    }

    /// Used volume.
    pub fn volume(&self) -> Decimal {
        self.items.iter().map(ItemGroup::volume).sum()
    }

    pub fn free_volume(&self) -> Decimal {
        self.max_volume - self.volume()
    }

    /// Add a group, merging into the first compatible group when one exists.
    ///
    /// Storage is left untouched when the result would exceed `max_volume`.
    /// Returns the id of the group that now holds the items.
    pub fn add_item_group(&mut self, group: ItemGroup) -> SimResult<EntityId> {
        let needed = group.volume();
        if self.volume() + needed > self.max_volume {
            return Err(
                SimError::invalid("max storage volume exceeded").with_data(json!({
                    "maxVolume": self.max_volume.to_string(),
                    "volume": self.volume().to_string(),
                    "adding": needed.to_string(),
                })),
            );
        }
        if let Some(existing) = self.items.iter_mut().find(|g| g.is_compatible(&group)) {
            existing.merge(&group)?;
            return Ok(existing.group_id.clone());
        }
        let id = group.group_id.clone();
        self.items.push(group);
        Ok(id)
    }

    /// Put items back into a specific group, e.g. when a sale is reverted.
    pub fn restock(&mut self, group_id: &EntityId, group: &ItemGroup) -> SimResult<()> {
        let needed = group.volume();
        if self.volume() + needed > self.max_volume {
            return Err(SimError::invalid("max storage volume exceeded"));
        }
        self.item_group_mut(group_id)?.merge(group)
    }

    pub fn item_group(&self, group_id: &EntityId) -> SimResult<&ItemGroup> {
        self.items
            .iter()
            .find(|g| &g.group_id == group_id)
            .ok_or_else(|| SimError::not_found("ItemGroup", group_id.as_str()))
    }

    pub fn item_group_mut(&mut self, group_id: &EntityId) -> SimResult<&mut ItemGroup> {
        self.items
            .iter_mut()
            .find(|g| &g.group_id == group_id)
            .ok_or_else(|| SimError::not_found("ItemGroup", group_id.as_str()))
    }

    /// Take `amount` units from the named group.
    pub fn take_items(&mut self, group_id: &EntityId, amount: Decimal) -> SimResult<ItemGroup> {
        self.item_group_mut(group_id)?.take(amount)
    }

    /// All groups of one item type, in storage order.
    pub fn item_groups_of_type<'a>(&'a self, item_id: &'a str) -> impl Iterator<Item = &'a ItemGroup> {
        self.items.iter().filter(move |g| g.def.id == item_id)
    }

    pub fn item_groups_of_type_mut<'a>(
        &'a mut self,
        item_id: &'a str,
    ) -> impl Iterator<Item = &'a mut ItemGroup> {
        self.items.iter_mut().filter(move |g| g.def.id == item_id)
    }

    /// Total on-hand amount of one item type across groups.
    pub fn total_amount_of_type(&self, item_id: &str) -> Decimal {
        self.item_groups_of_type(item_id).map(|g| g.amount).sum()
    }
}
