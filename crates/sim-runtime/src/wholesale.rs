use crate::auth::AuthContext;
use crate::company::CompanyService;
use crate::factory::FactoryService;
use crate::local_supplier::LocalSupplierService;
use crate::shop::ShopService;
use rust_decimal::Decimal;
use serde_json::json;
use sim_core::{
    check_unit_price, ContractStatus, EntityId, FieldUpdate, FilterOp, FirmRef, FirmType,
    ItemGroup, MemoryRepository, Query, QueryResult, SimConfig, SimError, SimResult,
    SupplyEntry, SupplyEntryPatch, SupplyStatus, WholesaleContract, WholesaleContractPatch,
};
use sim_econ::{distribute, Claim};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Supply listings, contracts between firms and their per-turn settlement.
pub struct WholesaleMarketService {
    supplies: Arc<MemoryRepository<SupplyEntry>>,
    contracts: Arc<MemoryRepository<WholesaleContract>>,
    company: Arc<CompanyService>,
    factory: Arc<FactoryService>,
    shop: Arc<ShopService>,
    local_supplier: Arc<LocalSupplierService>,
    config: Arc<SimConfig>,
}

impl WholesaleMarketService {
    pub fn new(
        supplies: Arc<MemoryRepository<SupplyEntry>>,
        contracts: Arc<MemoryRepository<WholesaleContract>>,
        company: Arc<CompanyService>,
        factory: Arc<FactoryService>,
        shop: Arc<ShopService>,
        local_supplier: Arc<LocalSupplierService>,
        config: Arc<SimConfig>,
    ) -> Self {
        Self {
            supplies,
            contracts,
            company,
            factory,
            shop,
            local_supplier,
            config,
        }
    }

    /// The live group backing a supply, plus the company that owns the supplying firm.
    async fn supplier_group(
        &self,
        supplier: &FirmRef,
        group_id: &EntityId,
    ) -> SimResult<(EntityId, ItemGroup)> {
        match supplier.firm_type {
            FirmType::Factory => {
                let factory = self.factory.get_factory(&supplier.firm_id).await?;
                let group = factory.storage.item_group(group_id)?.clone();
                Ok((factory.company_id, group))
            }
            FirmType::LocalSupplier => {
                let ls = self.local_supplier.get_local_supplier(&supplier.firm_id).await?;
                if &ls.selling_item_template.group_id != group_id {
                    return Err(SimError::not_found("ItemGroup", group_id.as_str()));
                }
                Ok((ls.company_id, ls.selling_item_template))
            }
            FirmType::Shop => Err(SimError::unexpected(format!(
                "{} firm {} cannot supply the wholesale market",
                supplier.firm_type, supplier.firm_id
            ))),
        }
    }

    /// List an item group on the market. One entry per group; the declared
    /// company must own the supplying firm.
    pub async fn register_supply(
        &self,
        auth: &AuthContext,
        supplier: FirmRef,
        item_group_id: &EntityId,
        price: Decimal,
        status: SupplyStatus,
    ) -> SimResult<SupplyEntry> {
        check_unit_price(price)?;
        let existing = self
            .supplies
            .query(&Query::count().eq("item_group_id", item_group_id))
            .await?;
        if existing.total.unwrap_or(0) > 0 {
            return Err(SimError::conflict(format!(
                "supply entry for item group {}:{item_group_id} already exists",
                supplier.firm_id
            )));
        }
        let (owner, group) = self.supplier_group(&supplier, item_group_id).await?;
        if owner != supplier.company_id {
            return Err(SimError::invalid(format!(
                "{} firm {} is not owned by company {}",
                supplier.firm_type, supplier.firm_id, supplier.company_id
            ))
            .with_data(json!({ "owner": owner.as_str() })));
        }
        let entry = SupplyEntry {
            id: EntityId::generate(),
            supplier,
            product_id: group.def.id.clone(),
            item_group_id: item_group_id.clone(),
            stock_amount: group.amount,
            price,
            status,
        };
        let entry = self.supplies.create(entry).await?;
        info!(%auth, id = %entry.id, product = %entry.product_id, %price, "supply registered");
        Ok(entry)
    }

    pub async fn get_supply(&self, id: &EntityId) -> SimResult<SupplyEntry> {
        self.supplies.read(id).await
    }

    pub async fn update_supply_price(
        &self,
        auth: &AuthContext,
        supply_id: &EntityId,
        price: Decimal,
    ) -> SimResult<SupplyEntry> {
        check_unit_price(price)?;
        let entry = self
            .supplies
            .update(
                supply_id,
                SupplyEntryPatch {
                    price: Some(price),
                    ..Default::default()
                },
            )
            .await?;
        info!(%auth, id = %supply_id, %price, "supply price updated");
        Ok(entry)
    }

    pub async fn set_supply_status(
        &self,
        auth: &AuthContext,
        supply_id: &EntityId,
        status: SupplyStatus,
    ) -> SimResult<SupplyEntry> {
        let entry = self
            .supplies
            .update(
                supply_id,
                SupplyEntryPatch {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;
        info!(%auth, id = %supply_id, status = status.as_str(), "supply status set");
        Ok(entry)
    }

    pub async fn supply_entries_of_firm(&self, firm_id: &EntityId) -> SimResult<Vec<SupplyEntry>> {
        let q = Query::all().eq("firm_id", firm_id);
        Ok(self.supplies.query(&q).await?.into_items())
    }

    /// Starting point for [`Self::query_suppliers`]: no row limit, with total.
    pub fn supplier_query() -> Query {
        Query::new().limit(None)
    }

    /// Search supply entries to contract with.
    pub async fn query_suppliers(&self, query: &Query) -> SimResult<QueryResult<SupplyEntry>> {
        self.supplies.query(query).await
    }

    /// Sign a standing order. The price limit defaults to a share of the current price.
    pub async fn create_contract(
        &self,
        auth: &AuthContext,
        supply_id: &EntityId,
        buyer: FirmRef,
        amount: Decimal,
        price_increase_limit: Option<Decimal>,
    ) -> SimResult<WholesaleContract> {
        if amount <= Decimal::ZERO {
            return Err(SimError::invalid("contract amount must be positive")
                .with_data(json!({ "amount": amount.to_string() })));
        }
        let same = Query::count()
            .eq("supply_entry_id", supply_id)
            .eq("buyer_firm_id", &buyer.firm_id);
        if self.contracts.query(&same).await?.total.unwrap_or(0) > 0 {
            return Err(SimError::conflict(format!(
                "wholesale contract for supply {supply_id} and buyer firm {} already exists",
                buyer.firm_id
            )));
        }
        let supply = self.supplies.read(supply_id).await?;
        let limit = match price_increase_limit {
            Some(limit) => limit,
            None => supply
                .price
                .checked_mul(self.config.default_price_increase_limit_ratio)
                .ok_or_else(|| SimError::invalid("price increase limit overflowed"))?,
        };
        let contract = WholesaleContract {
            id: EntityId::generate(),
            supply_entry_id: supply.id.clone(),
            supplier: supply.supplier.clone(),
            product_id: supply.product_id.clone(),
            buyer,
            amount,
            start_price: supply.price,
            price_increase_limit: limit,
            status: ContractStatus::Active,
        };
        let contract = self.contracts.create(contract).await?;
        info!(%auth, id = %contract.id, supply = %supply_id, %amount, "contract signed");
        Ok(contract)
    }

    /// Contracts where the firm is the supplier.
    pub async fn supply_contracts_of_firm(&self, firm_id: &EntityId) -> SimResult<Vec<WholesaleContract>> {
        let q = Query::all().eq("supplier_firm_id", firm_id);
        Ok(self.contracts.query(&q).await?.into_items())
    }

    /// Contracts where the firm is the buyer.
    pub async fn buy_contracts_of_firm(&self, firm_id: &EntityId) -> SimResult<Vec<WholesaleContract>> {
        let q = Query::all().eq("buyer_firm_id", firm_id);
        Ok(self.contracts.query(&q).await?.into_items())
    }

    /// End a contract for good.
    pub async fn terminate_contract(
        &self,
        auth: &AuthContext,
        contract_id: &EntityId,
    ) -> SimResult<WholesaleContract> {
        let contract = self.set_contract_terminated(contract_id).await?;
        info!(%auth, id = %contract_id, "contract terminated");
        Ok(contract)
    }

    async fn set_contract_terminated(&self, contract_id: &EntityId) -> SimResult<WholesaleContract> {
        self.contracts
            .update(
                contract_id,
                WholesaleContractPatch {
                    status: Some(ContractStatus::Terminated),
                },
            )
            .await
    }

    /// Wholesale step: settle every open supply entry in registration order.
    pub async fn progress_turn(&self) -> SimResult<()> {
        let open = Query::all().filter("status", FilterOp::Ne, SupplyStatus::Closed);
        for supply in self.supplies.query(&open).await?.into_items() {
            self.settle_supply(&supply).await?;
        }
        Ok(())
    }

    async fn settle_supply(&self, supply: &SupplyEntry) -> SimResult<()> {
        let (owner, group) = self
            .supplier_group(&supply.supplier, &supply.item_group_id)
            .await?;
        let available = group.amount;

        let active = Query::all()
            .eq("supply_entry_id", &supply.id)
            .eq("status", ContractStatus::Active);
        let (valid, expired): (Vec<_>, Vec<_>) = self
            .contracts
            .query(&active)
            .await?
            .into_items()
            .into_iter()
            .partition(|c| c.accepts_price(supply.price));
        for c in &expired {
            self.set_contract_terminated(&c.id).await?;
            info!(contract = %c.id, supply = %supply.id, price = %supply.price, "contract terminated by price rise");
        }

        let claims: Vec<Claim> = valid
            .iter()
            .map(|c| Claim::bounded(c.amount, Decimal::ONE))
            .collect();
        let distribution = distribute(available, &claims)?;
        let mut unsold = distribution.unsold;

        for (contract, units) in valid.iter().zip(distribution.allocations) {
            if units.is_zero() {
                continue;
            }
            let total_price = supply.price.checked_mul(units).ok_or_else(|| {
                SimError::invalid("wholesale total price overflowed")
                    .with_data(json!({ "price": supply.price.to_string(), "units": units.to_string() }))
            })?;
            let goods = self.sell_from_supplier(supply, units, total_price).await?;
            match self.deliver_to_buyer(&contract.buyer, goods.clone(), total_price).await {
                Ok(()) => {
                    debug!(contract = %contract.id, %units, %total_price, "contract filled");
                }
                Err(e @ SimError::InvalidOperation { .. }) => {
                    warn!(contract = %contract.id, error = %e, "buyer rejected delivery, sale reverted");
                    self.revert_sale(supply, &owner, &goods, total_price).await?;
                    unsold += units;
                }
                Err(e) => return Err(e),
            }
        }

        self.supplies
            .update(
                &supply.id,
                SupplyEntryPatch {
                    stock_amount: Some(FieldUpdate::Set(unsold)),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    async fn sell_from_supplier(
        &self,
        supply: &SupplyEntry,
        units: Decimal,
        total_price: Decimal,
    ) -> SimResult<ItemGroup> {
        let s = &supply.supplier;
        match s.firm_type {
            FirmType::Factory => {
                self.factory
                    .sell_item(&s.firm_id, &supply.item_group_id, units, total_price)
                    .await
            }
            FirmType::LocalSupplier => {
                self.local_supplier
                    .sell_item(&s.firm_id, &supply.item_group_id, units, total_price)
                    .await
            }
            FirmType::Shop => Err(SimError::unexpected(format!(
                "cannot sell from {} firm {}",
                s.firm_type, s.firm_id
            ))),
        }
    }

    async fn deliver_to_buyer(&self, buyer: &FirmRef, goods: ItemGroup, total_price: Decimal) -> SimResult<()> {
        match buyer.firm_type {
            FirmType::Factory => {
                self.factory.buy_item(&buyer.firm_id, goods, total_price).await?;
            }
            FirmType::Shop => {
                self.shop.buy_item(&buyer.firm_id, goods, total_price).await?;
            }
            FirmType::LocalSupplier => {
                return Err(SimError::unexpected(format!(
                    "cannot deliver to {} firm {}",
                    buyer.firm_type, buyer.firm_id
                )))
            }
        }
        Ok(())
    }

    /// Undo the supplier half of a sale whose delivery failed. `owner` is the
    /// company that was credited for it.
    async fn revert_sale(
        &self,
        supply: &SupplyEntry,
        owner: &EntityId,
        goods: &ItemGroup,
        total_price: Decimal,
    ) -> SimResult<()> {
        let s = &supply.supplier;
        if s.firm_type == FirmType::Factory {
            self.factory
                .restock_item(&s.firm_id, &supply.item_group_id, goods)
                .await?;
        }
        self.company.use_cash_fixed(owner, total_price).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Game;

    struct World {
        game: Game,
        auth: AuthContext,
        company_id: EntityId,
        gold_supply: SupplyEntry,
    }

    async fn world() -> World {
        let game = Game::new(SimConfig::default()).unwrap();
        game.initialize().await.unwrap();
        let auth = AuthContext::player("tester", None);
        let company = game
            .company
            .create_company(&auth, "Acme", Decimal::from(10_000_000))
            .await
            .unwrap();
        let gold_supply = game
            .wholesale
            .query_suppliers(&WholesaleMarketService::supplier_query().eq("product_id", "gold"))
            .await
            .unwrap()
            .into_items()
            .remove(0);
        World {
            game,
            auth,
            company_id: company.id,
            gold_supply,
        }
    }

    async fn factory(w: &World, storage: i64) -> FirmRef {
        let f = w
            .game
            .factory
            .create_factory(&w.auth, &w.company_id, Decimal::ONE, Decimal::from(storage))
            .await
            .unwrap();
        FirmRef::new(w.company_id.clone(), FirmType::Factory, f.id)
    }

    async fn shop(w: &World) -> FirmRef {
        let s = w
            .game
            .shop
            .create_shop(&w.auth, &w.company_id, Decimal::ONE, Decimal::from(10))
            .await
            .unwrap();
        FirmRef::new(w.company_id.clone(), FirmType::Shop, s.id)
    }

    async fn cash(w: &World, id: &EntityId) -> Decimal {
        w.game.company.get_company(id).await.unwrap().cash
    }

    #[tokio::test]
    async fn one_supply_per_item_group() {
        let w = world().await;
        let err = w
            .game
            .wholesale
            .register_supply(
                &w.auth,
                w.gold_supply.supplier.clone(),
                &w.gold_supply.item_group_id,
                Decimal::ONE,
                SupplyStatus::Public,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::Conflict { .. }));
        assert_eq!(w.gold_supply.stock_amount, Decimal::from(1_000_000));
        assert_eq!(w.gold_supply.price, Decimal::from(11));
    }

    #[tokio::test]
    async fn shops_cannot_supply() {
        let w = world().await;
        let s = shop(&w).await;
        let err = w
            .game
            .wholesale
            .register_supply(&w.auth, s, &EntityId::generate(), Decimal::ONE, SupplyStatus::Public)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn contract_defaults_and_uniqueness() {
        let w = world().await;
        let buyer = factory(&w, 10).await;
        let ws = &w.game.wholesale;
        let c = ws
            .create_contract(&w.auth, &w.gold_supply.id, buyer.clone(), Decimal::from(100), None)
            .await
            .unwrap();
        assert_eq!(c.price_increase_limit, Decimal::new(11, 1));
        assert_eq!(c.start_price, Decimal::from(11));
        assert_eq!(c.product_id, "gold");

        let dup = ws
            .create_contract(&w.auth, &w.gold_supply.id, buyer.clone(), Decimal::from(5), None)
            .await
            .unwrap_err();
        assert!(matches!(dup, SimError::Conflict { .. }));
        assert!(ws
            .create_contract(&w.auth, &w.gold_supply.id, buyer.clone(), Decimal::ZERO, None)
            .await
            .is_err());

        ws.terminate_contract(&w.auth, &c.id).await.unwrap();
        let again = ws
            .create_contract(&w.auth, &w.gold_supply.id, buyer.clone(), Decimal::from(5), None)
            .await
            .unwrap_err();
        assert!(matches!(again, SimError::Conflict { .. }));
        assert_eq!(ws.buy_contracts_of_firm(&buyer.firm_id).await.unwrap().len(), 1);
        assert_eq!(
            ws.supply_contracts_of_firm(&w.gold_supply.supplier.firm_id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn price_rise_past_limit_terminates() {
        let w = world().await;
        let buyer = factory(&w, 10).await;
        let ws = &w.game.wholesale;
        let c = ws
            .create_contract(&w.auth, &w.gold_supply.id, buyer.clone(), Decimal::from(100), None)
            .await
            .unwrap();

        // 11 + 1.1 is still acceptable
        ws.update_supply_price(&w.auth, &w.gold_supply.id, Decimal::new(121, 1)).await.unwrap();
        ws.progress_turn().await.unwrap();
        let items = w.game.factory.check_items(&buyer.firm_id).await.unwrap();
        assert_eq!(items[0].amount, Decimal::from(100));

        ws.update_supply_price(&w.auth, &w.gold_supply.id, Decimal::new(122, 1)).await.unwrap();
        ws.progress_turn().await.unwrap();
        let c = w.game.repositories.contracts.read(&c.id).await.unwrap();
        assert_eq!(c.status, ContractStatus::Terminated);
        let items = w.game.factory.check_items(&buyer.firm_id).await.unwrap();
        assert_eq!(items[0].amount, Decimal::from(100));
    }

    #[tokio::test]
    async fn failed_delivery_is_reverted() {
        let w = world().await;
        let buyer = factory(&w, 1).await;
        let npc = w.gold_supply.supplier.company_id.clone();
        let ws = &w.game.wholesale;
        ws.create_contract(&w.auth, &w.gold_supply.id, buyer.clone(), Decimal::from(2_000), None)
            .await
            .unwrap();
        let buyer_cash = cash(&w, &w.company_id).await;

        ws.progress_turn().await.unwrap();

        assert_eq!(cash(&w, &w.company_id).await, buyer_cash);
        assert_eq!(cash(&w, &npc).await, Decimal::ZERO);
        assert!(w.game.factory.check_items(&buyer.firm_id).await.unwrap().is_empty());
        let supply = ws.get_supply(&w.gold_supply.id).await.unwrap();
        assert_eq!(supply.stock_amount, Decimal::from(1_000_000));
    }

    #[tokio::test]
    async fn factory_stock_split_and_remainder_recorded() {
        let w = world().await;
        let seller = factory(&w, 10).await;
        let def = w.game.items.get("goldRing").unwrap().clone();
        let gid = w
            .game
            .factory
            .buy_item(&seller.firm_id, ItemGroup::new(def, Decimal::from(10)), Decimal::ZERO)
            .await
            .unwrap();
        let ws = &w.game.wholesale;
        let supply = ws
            .register_supply(&w.auth, seller.clone(), &gid, Decimal::from(300), SupplyStatus::Private)
            .await
            .unwrap();
        assert_eq!(supply.product_id, "goldRing");
        assert_eq!(ws.supply_entries_of_firm(&seller.firm_id).await.unwrap().len(), 1);

        let mut buyers = Vec::new();
        for _ in 0..3 {
            let b = shop(&w).await;
            ws.create_contract(&w.auth, &supply.id, b.clone(), Decimal::from(5), None)
                .await
                .unwrap();
            buyers.push(b);
        }
        ws.progress_turn().await.unwrap();

        for b in &buyers {
            let items = w.game.shop.check_items(&b.firm_id).await.unwrap();
            assert_eq!(items[0].amount, Decimal::from(3));
        }
        assert_eq!(ws.get_supply(&supply.id).await.unwrap().stock_amount, Decimal::ONE);
        let left = w.game.factory.check_items(&seller.firm_id).await.unwrap();
        assert_eq!(left[0].amount, Decimal::ONE);
    }

    #[tokio::test]
    async fn supplier_company_must_own_the_firm() {
        let w = world().await;
        let seller = factory(&w, 10).await;
        let def = w.game.items.get("goldRing").unwrap().clone();
        let gid = w
            .game
            .factory
            .buy_item(&seller.firm_id, ItemGroup::new(def, Decimal::from(10)), Decimal::ZERO)
            .await
            .unwrap();
        let bystander = w
            .game
            .company
            .create_company(&w.auth, "Bystander", Decimal::from(1_000))
            .await
            .unwrap();
        let declared = FirmRef::new(bystander.id.clone(), FirmType::Factory, seller.firm_id.clone());
        let err = w
            .game
            .wholesale
            .register_supply(&w.auth, declared, &gid, Decimal::from(5), SupplyStatus::Public)
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidOperation { .. }));
        assert!(w.game.wholesale.supply_entries_of_firm(&seller.firm_id).await.unwrap().is_empty());
        assert_eq!(cash(&w, &bystander.id).await, Decimal::from(1_000));
    }

    #[tokio::test]
    async fn out_of_range_prices_are_rejected() {
        let w = world().await;
        let buyer = factory(&w, 10).await;
        let ws = &w.game.wholesale;
        ws.create_contract(&w.auth, &w.gold_supply.id, buyer.clone(), Decimal::from(10), None)
            .await
            .unwrap();

        let err = ws
            .update_supply_price(&w.auth, &w.gold_supply.id, Decimal::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidOperation { .. }));
        assert!(ws
            .update_supply_price(&w.auth, &w.gold_supply.id, Decimal::NEGATIVE_ONE)
            .await
            .is_err());
        assert_eq!(ws.get_supply(&w.gold_supply.id).await.unwrap().price, Decimal::from(11));

        ws.progress_turn().await.unwrap();
        let items = w.game.factory.check_items(&buyer.firm_id).await.unwrap();
        assert_eq!(items[0].amount, Decimal::from(10));
    }

    #[tokio::test]
    async fn unbounded_tolerance_settles_at_max_price() {
        let w = world().await;
        let buyer = factory(&w, 10).await;
        let ws = &w.game.wholesale;
        ws.create_contract(
            &w.auth,
            &w.gold_supply.id,
            buyer.clone(),
            Decimal::from(2),
            Some(Decimal::MAX),
        )
        .await
        .unwrap();
        let max = Decimal::from(sim_core::MAX_UNIT_PRICE);
        ws.update_supply_price(&w.auth, &w.gold_supply.id, max).await.unwrap();
        let before = cash(&w, &w.company_id).await;

        ws.progress_turn().await.unwrap();

        assert_eq!(cash(&w, &w.company_id).await, before - max * Decimal::from(2));
        let items = w.game.factory.check_items(&buyer.firm_id).await.unwrap();
        assert_eq!(items[0].amount, Decimal::from(2));
    }

    #[tokio::test]
    async fn closed_supplies_are_skipped() {
        let w = world().await;
        let buyer = factory(&w, 10).await;
        let ws = &w.game.wholesale;
        ws.create_contract(&w.auth, &w.gold_supply.id, buyer.clone(), Decimal::from(10), None)
            .await
            .unwrap();
        ws.set_supply_status(&w.auth, &w.gold_supply.id, SupplyStatus::Closed).await.unwrap();
        ws.progress_turn().await.unwrap();
        assert!(w.game.factory.check_items(&buyer.firm_id).await.unwrap().is_empty());
    }
}
