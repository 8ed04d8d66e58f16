use crate::auth::AuthContext;
use crate::company::CompanyService;
use crate::local_supplier::LocalSupplierService;
use crate::wholesale::WholesaleMarketService;
use rust_decimal::Decimal;
use sim_core::{FirmRef, FirmType, ItemGroup, ItemLibrary, SimConfig, SimResult, SupplyEntry, SupplyStatus};
use std::sync::Arc;
use tracing::info;

pub const LOCAL_SUPPLIER_COMPANY_NAME: &str = "Local Supplier";

/// Seeds the NPC company and its public supplies for a new game.
pub struct LocalSupplierGenerator {
    company: Arc<CompanyService>,
    local_supplier: Arc<LocalSupplierService>,
    wholesale: Arc<WholesaleMarketService>,
    items: Arc<ItemLibrary>,
    config: Arc<SimConfig>,
}

impl LocalSupplierGenerator {
    pub fn new(
        company: Arc<CompanyService>,
        local_supplier: Arc<LocalSupplierService>,
        wholesale: Arc<WholesaleMarketService>,
        items: Arc<ItemLibrary>,
        config: Arc<SimConfig>,
    ) -> Self {
        Self {
            company,
            local_supplier,
            wholesale,
            items,
            config,
        }
    }

    /// One local supplier per configured seed, listed at `base_price * multiplier`.
    pub async fn generate(&self) -> SimResult<Vec<SupplyEntry>> {
        let auth = AuthContext::system();
        let npc = self
            .company
            .create_company(&auth, LOCAL_SUPPLIER_COMPANY_NAME, Decimal::ZERO)
            .await?;
        let mut supplies = Vec::with_capacity(self.config.local_supplies.len());
        for seed in &self.config.local_supplies {
            let def = self.items.get(&seed.item_id)?.clone();
            let price = def.base_price * self.config.local_supplier_price_multiplier;
            let template = ItemGroup::new(def, seed.amount);
            let template_id = template.group_id.clone();
            let supplier = self
                .local_supplier
                .create_local_supplier(&npc.id, template)
                .await?;
            let firm = FirmRef::new(npc.id.clone(), FirmType::LocalSupplier, supplier.id);
            let entry = self
                .wholesale
                .register_supply(&auth, firm, &template_id, price, SupplyStatus::Public)
                .await?;
            supplies.push(entry);
        }
        info!(count = supplies.len(), "local supplies generated");
        Ok(supplies)
    }
}
