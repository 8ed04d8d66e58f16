use crate::auth::AuthContext;
use crate::company::CompanyService;
use rust_decimal::Decimal;
use sim_core::{
    EntityId, Factory, FactoryPatch, FactoryProcessLibrary, ItemGroup, ItemLibrary, ItemStorage,
    MemoryRepository, Query, SimConfig, SimResult,
};
use sim_econ::{construction_price, manufacture};
use std::sync::Arc;
use tracing::{debug, info};

/// Factory construction, storage trade and the per-turn manufacture step.
pub struct FactoryService {
    factories: Arc<MemoryRepository<Factory>>,
    company: Arc<CompanyService>,
    items: Arc<ItemLibrary>,
    processes: Arc<FactoryProcessLibrary>,
    config: Arc<SimConfig>,
}

impl FactoryService {
    pub fn new(
        factories: Arc<MemoryRepository<Factory>>,
        company: Arc<CompanyService>,
        items: Arc<ItemLibrary>,
        processes: Arc<FactoryProcessLibrary>,
        config: Arc<SimConfig>,
    ) -> Self {
        Self {
            factories,
            company,
            items,
            processes,
            config,
        }
    }

    pub fn construction_price(&self, size: Decimal, storage_volume: Decimal) -> SimResult<Decimal> {
        Ok(construction_price(
            size,
            storage_volume,
            self.config.factory_price_per_size,
            self.config.factory_price_per_storage_volume,
        )?)
    }

    /// Build a factory. The price is withdrawn first; nothing is built if that fails.
    pub async fn create_factory(
        &self,
        auth: &AuthContext,
        company_id: &EntityId,
        size: Decimal,
        storage_volume: Decimal,
    ) -> SimResult<Factory> {
        let price = self.construction_price(size, storage_volume)?;
        self.company.use_cash_one_time(company_id, price).await?;
        let factory = Factory::new(company_id.clone(), size, ItemStorage::new(storage_volume));
        let factory = self.factories.create(factory).await?;
        info!(%auth, id = %factory.id, %company_id, %price, "factory built");
        Ok(factory)
    }

    pub async fn get_factory(&self, id: &EntityId) -> SimResult<Factory> {
        self.factories.read(id).await
    }

    pub async fn factories_of_company(&self, company_id: &EntityId) -> SimResult<Vec<Factory>> {
        let q = Query::all().eq("company_id", company_id);
        Ok(self.factories.query(&q).await?.into_items())
    }

    /// Assign a process from the catalog, or stop production with `None`.
    pub async fn set_factory_process(
        &self,
        auth: &AuthContext,
        factory_id: &EntityId,
        process_id: Option<&str>,
    ) -> SimResult<Factory> {
        let process = process_id
            .map(|id| self.processes.get(id).cloned())
            .transpose()?;
        let factory = self
            .factories
            .update(
                factory_id,
                FactoryPatch {
                    process: Some(process),
                },
            )
            .await?;
        info!(%auth, id = %factory_id, process = ?process_id, "factory process set");
        Ok(factory)
    }

    /// Store `group` and pay `price` unconditionally. Fails before paying when it does not fit.
    pub async fn buy_item(&self, factory_id: &EntityId, group: ItemGroup, price: Decimal) -> SimResult<EntityId> {
        let (factory, group_id) = self
            .factories
            .mutate(factory_id, |f| f.storage.add_item_group(group))
            .await?;
        self.company.use_cash_fixed(&factory.company_id, price).await?;
        Ok(group_id)
    }

    /// Take `amount` from a stored group and collect `price`. Returns the taken items.
    pub async fn sell_item(
        &self,
        factory_id: &EntityId,
        group_id: &EntityId,
        amount: Decimal,
        price: Decimal,
    ) -> SimResult<ItemGroup> {
        let (factory, taken) = self
            .factories
            .mutate(factory_id, |f| f.storage.take_items(group_id, amount))
            .await?;
        self.company.gain_revenue(&factory.company_id, price).await?;
        Ok(taken)
    }

    /// Put previously sold items back into their group without touching cash.
    pub async fn restock_item(
        &self,
        factory_id: &EntityId,
        group_id: &EntityId,
        group: &ItemGroup,
    ) -> SimResult<()> {
        self.factories
            .mutate(factory_id, |f| f.storage.restock(group_id, group))
            .await?;
        Ok(())
    }

    pub async fn check_items(&self, factory_id: &EntityId) -> SimResult<Vec<ItemGroup>> {
        Ok(self.get_factory(factory_id).await?.storage.items().to_vec())
    }

    /// Manufacture step: every factory with a process runs it once and pays the running cost.
    pub async fn progress_turn(&self) -> SimResult<()> {
        let factories = self.factories.query(&Query::all()).await?.into_items();
        for factory in factories.iter().filter(|f| f.process.is_some()) {
            let (_, outcome) = self
                .factories
                .mutate(&factory.id, |f| match f.process.clone() {
                    Some(p) => manufacture(&mut f.storage, &p, f.size, &self.items),
                    None => Ok(sim_econ::ManufactureOutcome::idle()),
                })
                .await?;
            if outcome.cost > Decimal::ZERO {
                self.company.use_cash_fixed(&factory.company_id, outcome.cost).await?;
            }
            debug!(factory = %factory.id, units = %outcome.units, cost = %outcome.cost, "factory step");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{Company, SimError};

    struct Fixture {
        svc: FactoryService,
        company: Arc<CompanyService>,
        company_id: EntityId,
    }

    async fn fixture(cash: i64) -> Fixture {
        let company = Arc::new(CompanyService::new(Arc::new(MemoryRepository::<Company>::new())));
        let c = company
            .create_company(&AuthContext::system(), "Acme", Decimal::from(cash))
            .await
            .unwrap();
        let svc = FactoryService::new(
            Arc::new(MemoryRepository::new()),
            company.clone(),
            Arc::new(ItemLibrary::builtin()),
            Arc::new(FactoryProcessLibrary::builtin()),
            Arc::new(SimConfig::default()),
        );
        Fixture {
            svc,
            company,
            company_id: c.id,
        }
    }

    fn gold(amount: i64) -> ItemGroup {
        let def = ItemLibrary::builtin().get("gold").unwrap().clone();
        ItemGroup::new(def, Decimal::from(amount))
    }

    async fn cash(fx: &Fixture) -> Decimal {
        fx.company.get_company(&fx.company_id).await.unwrap().cash
    }

    #[tokio::test]
    async fn construction_withdraws_price() {
        let fx = fixture(10_000_000).await;
        let auth = AuthContext::system();
        let f = fx
            .svc
            .create_factory(&auth, &fx.company_id, Decimal::ONE, Decimal::from(10))
            .await
            .unwrap();
        assert_eq!(cash(&fx).await, Decimal::from(9_890_000));
        assert_eq!(fx.svc.factories_of_company(&fx.company_id).await.unwrap(), vec![f]);
    }

    #[tokio::test]
    async fn construction_fails_without_cash() {
        let fx = fixture(1_000).await;
        let err = fx
            .svc
            .create_factory(&AuthContext::system(), &fx.company_id, Decimal::ONE, Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidOperation { .. }));
        assert!(fx.svc.factories_of_company(&fx.company_id).await.unwrap().is_empty());
        assert_eq!(cash(&fx).await, Decimal::from(1_000));
    }

    #[tokio::test]
    async fn buy_that_overflows_costs_nothing() {
        let fx = fixture(1_000_000).await;
        let f = fx
            .svc
            .create_factory(&AuthContext::system(), &fx.company_id, Decimal::ONE, Decimal::ONE)
            .await
            .unwrap();
        let before = cash(&fx).await;
        let err = fx.svc.buy_item(&f.id, gold(2_000), Decimal::from(5)).await.unwrap_err();
        assert!(matches!(err, SimError::InvalidOperation { .. }));
        assert_eq!(cash(&fx).await, before);
        assert!(fx.svc.check_items(&f.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sell_takes_items_and_credits_revenue() {
        let fx = fixture(1_000_000).await;
        let f = fx
            .svc
            .create_factory(&AuthContext::system(), &fx.company_id, Decimal::ONE, Decimal::ONE)
            .await
            .unwrap();
        let gid = fx.svc.buy_item(&f.id, gold(500), Decimal::from(50)).await.unwrap();
        let before = cash(&fx).await;
        let taken = fx
            .svc
            .sell_item(&f.id, &gid, Decimal::from(200), Decimal::from(30))
            .await
            .unwrap();
        assert_eq!(taken.amount, Decimal::from(200));
        assert_eq!(cash(&fx).await, before + Decimal::from(30));
        let items = fx.svc.check_items(&f.id).await.unwrap();
        assert_eq!(items[0].amount, Decimal::from(300));

        let err = fx
            .svc
            .sell_item(&f.id, &gid, Decimal::from(301), Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidOperation { .. }));
        assert!(fx
            .svc
            .sell_item(&f.id, &EntityId::from("nope"), Decimal::ONE, Decimal::ONE)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn manufacture_step_charges_running_cost() {
        let fx = fixture(10_000_000).await;
        let auth = AuthContext::system();
        let f = fx
            .svc
            .create_factory(&auth, &fx.company_id, Decimal::ONE, Decimal::from(10))
            .await
            .unwrap();
        fx.svc.set_factory_process(&auth, &f.id, Some("goldRing")).await.unwrap();
        fx.svc.buy_item(&f.id, gold(1_000), Decimal::ZERO).await.unwrap();
        let before = cash(&fx).await;

        fx.svc.progress_turn().await.unwrap();

        let f = fx.svc.get_factory(&f.id).await.unwrap();
        assert_eq!(f.storage.total_amount_of_type("gold"), Decimal::from(800));
        assert_eq!(f.storage.total_amount_of_type("goldRing"), Decimal::from(50));
        assert_eq!(cash(&fx).await, before - Decimal::from(2_000));

        fx.svc.set_factory_process(&auth, &f.id, None).await.unwrap();
        fx.svc.progress_turn().await.unwrap();
        let f = fx.svc.get_factory(&f.id).await.unwrap();
        assert_eq!(f.storage.total_amount_of_type("goldRing"), Decimal::from(50));
    }

    #[tokio::test]
    async fn unknown_process_is_not_found() {
        let fx = fixture(10_000_000).await;
        let auth = AuthContext::system();
        let f = fx
            .svc
            .create_factory(&auth, &fx.company_id, Decimal::ONE, Decimal::ONE)
            .await
            .unwrap();
        let err = fx
            .svc
            .set_factory_process(&auth, &f.id, Some("perpetualMotion"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
