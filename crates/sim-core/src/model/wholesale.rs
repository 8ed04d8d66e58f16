use crate::error::SimResult;
use crate::id::EntityId;
use crate::repository::{Entity, FieldUpdate, FieldValue};
use super::firm::FirmRef;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Visibility of a supply entry. Closed entries are skipped by settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyStatus {
    Public,
    Private,
    Closed,
}

impl SupplyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SupplyStatus::Public => "public",
            SupplyStatus::Private => "private",
            SupplyStatus::Closed => "closed",
        }
    }
}

impl From<SupplyStatus> for FieldValue {
    fn from(v: SupplyStatus) -> Self {
        FieldValue::Str(v.as_str().to_string())
    }
}

/// A firm's item group offered on the wholesale market.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplyEntry {
    pub id: EntityId,
    pub supplier: FirmRef,
    pub product_id: String,
    /// Handle of the backing group inside the supplier's storage.
    pub item_group_id: EntityId,
    /// Stock left unsold after the last settlement.
    pub stock_amount: Decimal,
    pub price: Decimal,
    pub status: SupplyStatus,
}

#[derive(Clone, Debug, Default)]
pub struct SupplyEntryPatch {
    pub stock_amount: Option<FieldUpdate<Decimal>>,
    pub price: Option<Decimal>,
    pub status: Option<SupplyStatus>,
}

impl Entity for SupplyEntry {
    type Patch = SupplyEntryPatch;
    const ENTITY_TYPE: &'static str = "SupplyEntry";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => (&self.id).into(),
            "company_id" => (&self.supplier.company_id).into(),
            "firm_type" => self.supplier.firm_type.into(),
            "firm_id" => (&self.supplier.firm_id).into(),
            "product_id" => self.product_id.as_str().into(),
            "item_group_id" => (&self.item_group_id).into(),
            "stock_amount" => self.stock_amount.into(),
            "price" => self.price.into(),
            "status" => self.status.into(),
            _ => return None,
        })
    }

    fn apply_patch(&mut self, patch: SupplyEntryPatch) -> SimResult<()> {
        if let Some(stock) = patch.stock_amount {
            stock.apply(&mut self.stock_amount)?;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Active,
    Terminated,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Terminated => "terminated",
        }
    }
}

impl From<ContractStatus> for FieldValue {
    fn from(v: ContractStatus) -> Self {
        FieldValue::Str(v.as_str().to_string())
    }
}

/// Standing order against a supply entry, filled a little every turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WholesaleContract {
    pub id: EntityId,
    pub supply_entry_id: EntityId,
    /// Copied from the supply entry at signing so either side can query.
    pub supplier: FirmRef,
    pub product_id: String,
    pub buyer: FirmRef,
    /// Units requested per turn.
    pub amount: Decimal,
    pub start_price: Decimal,
    /// Tolerated rise above `start_price` before the contract terminates.
    pub price_increase_limit: Decimal,
    pub status: ContractStatus,
}

impl WholesaleContract {
    /// Whether the buyer still accepts `current_price`.
    ///
    /// A tolerance beyond the representable range accepts every price.
    pub fn accepts_price(&self, current_price: Decimal) -> bool {
        self.start_price
            .checked_add(self.price_increase_limit)
            .map_or(true, |max| max >= current_price)
    }
}

#[derive(Clone, Debug, Default)]
pub struct WholesaleContractPatch {
    pub status: Option<ContractStatus>,
}

impl Entity for WholesaleContract {
    type Patch = WholesaleContractPatch;
    const ENTITY_TYPE: &'static str = "WholesaleContract";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => (&self.id).into(),
            "supply_entry_id" => (&self.supply_entry_id).into(),
            "supplier_company_id" => (&self.supplier.company_id).into(),
            "supplier_firm_type" => self.supplier.firm_type.into(),
            "supplier_firm_id" => (&self.supplier.firm_id).into(),
            "product_id" => self.product_id.as_str().into(),
            "buyer_company_id" => (&self.buyer.company_id).into(),
            "buyer_firm_type" => self.buyer.firm_type.into(),
            "buyer_firm_id" => (&self.buyer.firm_id).into(),
            "amount" => self.amount.into(),
            "start_price" => self.start_price.into(),
            "price_increase_limit" => self.price_increase_limit.into(),
            "status" => self.status.into(),
            _ => return None,
        })
    }

    fn apply_patch(&mut self, patch: WholesaleContractPatch) -> SimResult<()> {
        if let Some(status) = patch.status {
            self.status = status;
        }
        Ok(())
    }
}
