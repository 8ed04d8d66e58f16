use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inexhaustible supply seeded for the NPC local supplier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalSupplySeed {
    pub item_id: String,
    pub amount: Decimal,
}

/// Simulation configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Construction cost of one factory size unit.
    pub factory_price_per_size: Decimal,
    /// Construction cost of one unit of factory storage volume.
    pub factory_price_per_storage_volume: Decimal,
    pub shop_price_per_size: Decimal,
    pub shop_price_per_storage_volume: Decimal,
    /// Contract price tolerance as a fraction of the supply price at signing.
    pub default_price_increase_limit_ratio: Decimal,
    /// Local suppliers sell at `base_price * multiplier`.
    pub local_supplier_price_multiplier: Decimal,
    pub local_supplies: Vec<LocalSupplySeed>,
    /// Game date of a fresh game.
    pub start_date: NaiveDate,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            factory_price_per_size: Decimal::from(100_000),
            factory_price_per_storage_volume: Decimal::from(1_000),
            shop_price_per_size: Decimal::from(400_000),
            shop_price_per_storage_volume: Decimal::from(1_000),
            default_price_increase_limit_ratio: Decimal::new(1, 1),
            local_supplier_price_multiplier: Decimal::new(11, 1),
            local_supplies: vec![LocalSupplySeed {
                item_id: "gold".into(),
                amount: Decimal::from(1_000_000),
            }],
            start_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
        }
    }
}
