//! Persisted entities and their patches.

mod company;
mod factory;
mod firm;
mod global_state;
mod local_supplier;
mod shop;
mod wholesale;

pub use company::{Company, CompanyPatch};
pub use factory::{Factory, FactoryPatch};
pub use firm::{FirmRef, FirmType};
pub use global_state::{GlobalState, GlobalStatePatch, GLOBAL_STATE_ID};
pub use local_supplier::{LocalSupplier, LocalSupplierPatch};
pub use shop::{SaleEntry, Shop, ShopPatch};
pub use wholesale::{
    ContractStatus, SupplyEntry, SupplyEntryPatch, SupplyStatus, WholesaleContract,
    WholesaleContractPatch,
};

use crate::error::{SimError, SimResult};
use rust_decimal::Decimal;
use serde_json::json;

/// Highest unit price accepted on the wholesale or retail market.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000_000;

/// A listed unit price must lie in `0..=MAX_UNIT_PRICE`.
pub fn check_unit_price(price: Decimal) -> SimResult<()> {
    if price < Decimal::ZERO || price > Decimal::from(MAX_UNIT_PRICE) {
        return Err(SimError::invalid("unit price out of range").with_data(json!({
            "price": price.to_string(),
            "max": MAX_UNIT_PRICE,
        })));
    }
    Ok(())
}
