use crate::company::CompanyService;
use crate::factory::FactoryService;
use crate::generator::LocalSupplierGenerator;
use crate::global_state::GlobalStateContainer;
use crate::local_supplier::LocalSupplierService;
use crate::retail::RetailMarketService;
use crate::shop::ShopService;
use crate::turn::{TurnProgressSystem, TurnStepFuture, FACTORY_STEP, RETAIL_SALE_STEP, WHOLESALE_STEP};
use crate::wholesale::WholesaleMarketService;
use chrono::NaiveDate;
use persistence::{open_repository, save_repository, Pool};
use sim_core::{
    Company, Factory, FactoryProcessLibrary, GlobalState, ItemLibrary, LocalSupplier,
    MemoryRepository, RetailMarketLibrary, Shop, SimConfig, SimResult, SupplyEntry,
    WholesaleContract,
};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// One repository per entity type.
#[derive(Default)]
pub struct Repositories {
    pub companies: Arc<MemoryRepository<Company>>,
    pub factories: Arc<MemoryRepository<Factory>>,
    pub shops: Arc<MemoryRepository<Shop>>,
    pub local_suppliers: Arc<MemoryRepository<LocalSupplier>>,
    pub supplies: Arc<MemoryRepository<SupplyEntry>>,
    pub contracts: Arc<MemoryRepository<WholesaleContract>>,
    pub global_states: Arc<MemoryRepository<GlobalState>>,
}

/// Composition root: repositories, catalogs and services of one game.
pub struct Game {
    pub config: Arc<SimConfig>,
    pub items: Arc<ItemLibrary>,
    pub processes: Arc<FactoryProcessLibrary>,
    pub retail_markets: Arc<RetailMarketLibrary>,
    pub repositories: Repositories,
    pub company: Arc<CompanyService>,
    pub factory: Arc<FactoryService>,
    pub shop: Arc<ShopService>,
    pub local_supplier: Arc<LocalSupplierService>,
    pub wholesale: Arc<WholesaleMarketService>,
    pub retail: Arc<RetailMarketService>,
    pub global_state: Arc<GlobalStateContainer>,
    pub turn: Arc<TurnProgressSystem>,
}

fn step<S, F, Fut>(service: &Arc<S>, f: F) -> impl Fn() -> TurnStepFuture + Send + Sync + 'static
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SimResult<()>> + Send + 'static,
{
    let service = service.clone();
    move || -> TurnStepFuture { Box::pin(f(service.clone())) }
}

impl Game {
    /// A game over the built-in catalogs.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        Self::with_catalogs(
            config,
            ItemLibrary::builtin(),
            FactoryProcessLibrary::builtin(),
            RetailMarketLibrary::builtin(),
        )
    }

    pub fn with_catalogs(
        config: SimConfig,
        items: ItemLibrary,
        processes: FactoryProcessLibrary,
        retail_markets: RetailMarketLibrary,
    ) -> SimResult<Self> {
        let config = Arc::new(config);
        let items = Arc::new(items);
        let processes = Arc::new(processes);
        let retail_markets = Arc::new(retail_markets);
        let repos = Repositories::default();

        let company = Arc::new(CompanyService::new(repos.companies.clone()));
        let factory = Arc::new(FactoryService::new(
            repos.factories.clone(),
            company.clone(),
            items.clone(),
            processes.clone(),
            config.clone(),
        ));
        let shop = Arc::new(ShopService::new(repos.shops.clone(), company.clone(), config.clone()));
        let local_supplier = Arc::new(LocalSupplierService::new(
            repos.local_suppliers.clone(),
            company.clone(),
        ));
        let wholesale = Arc::new(WholesaleMarketService::new(
            repos.supplies.clone(),
            repos.contracts.clone(),
            company.clone(),
            factory.clone(),
            shop.clone(),
            local_supplier.clone(),
            config.clone(),
        ));
        let retail = Arc::new(RetailMarketService::new(shop.clone(), retail_markets.clone()));
        let global_state = Arc::new(GlobalStateContainer::new(
            repos.global_states.clone(),
            config.start_date,
        ));
        let turn = Arc::new(TurnProgressSystem::new(global_state.clone()));

        turn.register_callback(
            FACTORY_STEP,
            step(&factory, |s| async move { s.progress_turn().await }),
        )?;
        turn.register_callback(
            RETAIL_SALE_STEP,
            step(&retail, |s| async move { s.progress_turn().await }),
        )?;
        turn.register_callback(
            WHOLESALE_STEP,
            step(&wholesale, |s| async move { s.progress_turn().await }),
        )?;

        Ok(Self {
            config,
            items,
            processes,
            retail_markets,
            repositories: repos,
            company,
            factory,
            shop,
            local_supplier,
            wholesale,
            retail,
            global_state,
            turn,
        })
    }

    /// Prepare a fresh game. Local suppliers are generated only once.
    pub async fn initialize(&self) -> SimResult<()> {
        if self.global_state.initialize().await? {
            LocalSupplierGenerator::new(
                self.company.clone(),
                self.local_supplier.clone(),
                self.wholesale.clone(),
                self.items.clone(),
                self.config.clone(),
            )
            .generate()
            .await?;
        }
        Ok(())
    }

    pub async fn progress_turn(&self) -> SimResult<NaiveDate> {
        self.turn.progress_turn().await
    }

    /// Write every repository under `game_id`.
    pub async fn save(&self, pool: &Pool, game_id: &str) -> anyhow::Result<()> {
        let r = &self.repositories;
        save_repository(pool, game_id, &r.companies).await?;
        save_repository(pool, game_id, &r.factories).await?;
        save_repository(pool, game_id, &r.shops).await?;
        save_repository(pool, game_id, &r.local_suppliers).await?;
        save_repository(pool, game_id, &r.supplies).await?;
        save_repository(pool, game_id, &r.contracts).await?;
        save_repository(pool, game_id, &r.global_states).await?;
        persistence::create_save(pool, game_id, None).await?;
        info!(game_id, "game saved");
        Ok(())
    }

    /// Load a saved game over the built-in catalogs.
    pub async fn open(config: SimConfig, pool: &Pool, game_id: &str) -> anyhow::Result<Self> {
        let game = Self::new(config)?;
        let r = &game.repositories;
        open_repository(pool, game_id, &r.companies).await?;
        open_repository(pool, game_id, &r.factories).await?;
        open_repository(pool, game_id, &r.shops).await?;
        open_repository(pool, game_id, &r.local_suppliers).await?;
        open_repository(pool, game_id, &r.supplies).await?;
        open_repository(pool, game_id, &r.contracts).await?;
        let states = open_repository(pool, game_id, &r.global_states).await?;
        if states == 0 {
            anyhow::bail!("save {game_id} has no global state");
        }
        info!(game_id, "game opened");
        Ok(game)
    }
}
