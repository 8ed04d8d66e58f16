//! Built-in static catalogs: item definitions, factory processes and retail
//! market data. These are read-only for the lifetime of a game.

use crate::error::{SimError, SimResult};
use crate::item::ItemDefinition;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Item type and amount used by a process recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemBatch {
    pub id: String,
    pub amount: Decimal,
}

impl ItemBatch {
    pub fn new(id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: id.into(),
            amount,
        }
    }
}

/// Manufacturing recipe. `input`/`output` describe one process unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactoryProcess {
    pub id: String,
    /// Materials consumed per unit; item types are distinct.
    pub input: Vec<ItemBatch>,
    /// Products made per unit.
    pub output: Vec<ItemBatch>,
    /// Units per turn on a size-1 factory.
    pub throughput: Decimal,
    /// Running cost per unit.
    pub manufacturing_cost: Decimal,
}

/// Consumer-market data for one item type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetailMarketData {
    pub item_id: String,
    /// Units demanded per turn across all sellers.
    pub daily_demand: Decimal,
    pub base_retail_price: Decimal,
    /// The NPC competitor every shop sells against.
    pub local_supplier: RetailCompetitor,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetailCompetitor {
    pub size: Decimal,
    pub price: Decimal,
}

/// Item definitions by id.
#[derive(Clone, Debug)]
pub struct ItemLibrary {
    defs: BTreeMap<String, ItemDefinition>,
}

impl ItemLibrary {
    pub fn new(defs: impl IntoIterator<Item = ItemDefinition>) -> Self {
        Self {
            defs: defs.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }

    pub fn builtin() -> Self {
        let d = |id: &str, volume: Decimal, price: i64| ItemDefinition::new(id, volume, Decimal::from(price));
        Self::new([
            d("coal", Decimal::ONE, 10),
            d("ironOre", Decimal::ONE, 10),
            d("steel", Decimal::ONE, 10),
            d("gold", Decimal::new(1, 3), 10),
            d("goldRing", Decimal::new(1, 2), 300),
            d("watch", Decimal::new(1, 2), 30),
            d("electronicWatch", Decimal::new(1, 2), 20),
        ])
    }

    /// Look up a definition; unknown ids are reported as `NotFound`.
    pub fn get(&self, item_id: &str) -> SimResult<&ItemDefinition> {
        self.defs
            .get(item_id)
            .ok_or_else(|| SimError::not_found("ItemDefinition", item_id))
    }

    pub fn all(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.defs.values()
    }
}

/// Factory processes by id.
#[derive(Clone, Debug)]
pub struct FactoryProcessLibrary {
    processes: BTreeMap<String, FactoryProcess>,
}

impl FactoryProcessLibrary {
    pub fn new(processes: impl IntoIterator<Item = FactoryProcess>) -> Self {
        Self {
            processes: processes.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new([
            FactoryProcess {
                id: "steel".into(),
                input: vec![ItemBatch::new("coal", Decimal::ONE)],
                output: vec![ItemBatch::new("steel", Decimal::ONE)],
                throughput: Decimal::from(100_000),
                manufacturing_cost: Decimal::from(100),
            },
            FactoryProcess {
                id: "goldRing".into(),
                input: vec![ItemBatch::new("gold", Decimal::from(4))],
                output: vec![ItemBatch::new("goldRing", Decimal::ONE)],
                throughput: Decimal::from(50),
                manufacturing_cost: Decimal::from(40),
            },
        ])
    }

    pub fn get(&self, process_id: &str) -> SimResult<&FactoryProcess> {
        self.processes
            .get(process_id)
            .ok_or_else(|| SimError::not_found("FactoryProcess", process_id))
    }

    pub fn all(&self) -> impl Iterator<Item = &FactoryProcess> {
        self.processes.values()
    }
}

/// Retail market data by item id.
#[derive(Clone, Debug)]
pub struct RetailMarketLibrary {
    markets: BTreeMap<String, RetailMarketData>,
}

impl RetailMarketLibrary {
    pub fn new(markets: impl IntoIterator<Item = RetailMarketData>) -> Self {
        Self {
            markets: markets.into_iter().map(|m| (m.item_id.clone(), m)).collect(),
        }
    }

    pub fn builtin() -> Self {
        let m = |id: &str, demand: i64, base: i64, size: i64, price: i64| RetailMarketData {
            item_id: id.into(),
            daily_demand: Decimal::from(demand),
            base_retail_price: Decimal::from(base),
            local_supplier: RetailCompetitor {
                size: Decimal::from(size),
                price: Decimal::from(price),
            },
        };
        Self::new([
            m("goldRing", 5_000, 300, 5_000, 500),
            m("watch", 10_000, 30, 10_000, 50),
            m("electronicWatch", 10_000, 20, 10_000, 40),
        ])
    }

    /// Items without a consumer market return `None`.
    pub fn get(&self, item_id: &str) -> Option<&RetailMarketData> {
        self.markets.get(item_id)
    }
}
