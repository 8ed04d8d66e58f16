use crate::shop::{Listing, ShopService};
use rust_decimal::Decimal;
use sim_core::{RetailMarketData, RetailMarketLibrary, SimError, SimResult};
use sim_econ::{distribute, retail_rating, supply_weight, Claim};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Clears consumer demand across shop listings and the NPC competitor.
pub struct RetailMarketService {
    shop: Arc<ShopService>,
    markets: Arc<RetailMarketLibrary>,
}

impl RetailMarketService {
    pub fn new(shop: Arc<ShopService>, markets: Arc<RetailMarketLibrary>) -> Self {
        Self { shop, markets }
    }

    /// Units each listing would sell this turn, aligned with `listings`.
    ///
    /// The NPC competitor takes part in the split but its share is dropped.
    pub fn allocate(market: &RetailMarketData, listings: &[Listing]) -> SimResult<Vec<Decimal>> {
        let mut claims = Vec::with_capacity(listings.len() + 1);
        for l in listings {
            let rating = retail_rating(l.price, market.base_retail_price)?;
            let weight = supply_weight(l.size, rating)?.unwrap_or(Decimal::ZERO);
            claims.push(Claim::bounded(l.available, weight));
        }
        let npc = &market.local_supplier;
        let npc_rating = retail_rating(npc.price, market.base_retail_price)?;
        if let Some(weight) = supply_weight(npc.size, npc_rating)? {
            claims.push(Claim::unbounded(weight));
        }
        let mut allocations = distribute(market.daily_demand, &claims)?.allocations;
        allocations.truncate(listings.len());
        Ok(allocations)
    }

    /// Retail step: sell to consumers from every shop listing.
    pub async fn progress_turn(&self) -> SimResult<()> {
        let mut by_item: BTreeMap<String, Vec<Listing>> = BTreeMap::new();
        for listing in self.shop.selling_data().await? {
            by_item.entry(listing.item_id.clone()).or_default().push(listing);
        }

        for (item_id, listings) in by_item {
            let Some(market) = self.markets.get(&item_id) else {
                debug!(item = %item_id, "no consumer market, listings skipped");
                continue;
            };
            let allocations = Self::allocate(market, &listings)?;
            for (listing, units) in listings.iter().zip(allocations) {
                if units.is_zero() {
                    continue;
                }
                let revenue = listing
                    .price
                    .checked_mul(units)
                    .ok_or_else(|| SimError::invalid("retail revenue overflowed"))?;
                self.shop
                    .sell_item(&listing.shop_id, &listing.item_group_id, units, revenue)
                    .await?;
                debug!(shop = %listing.shop_id, item = %item_id, %units, "retail sale");
            }
        }
        Ok(())
    }
}
