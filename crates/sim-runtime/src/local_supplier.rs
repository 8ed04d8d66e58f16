use crate::company::CompanyService;
use rust_decimal::Decimal;
use sim_core::{EntityId, ItemGroup, LocalSupplier, MemoryRepository, SimError, SimResult};
use std::sync::Arc;
use tracing::info;

/// NPC suppliers with an unlimited stock template.
pub struct LocalSupplierService {
    suppliers: Arc<MemoryRepository<LocalSupplier>>,
    company: Arc<CompanyService>,
}

impl LocalSupplierService {
    pub fn new(suppliers: Arc<MemoryRepository<LocalSupplier>>, company: Arc<CompanyService>) -> Self {
        Self { suppliers, company }
    }

    pub async fn create_local_supplier(
        &self,
        company_id: &EntityId,
        selling_item_template: ItemGroup,
    ) -> SimResult<LocalSupplier> {
        let supplier = self
            .suppliers
            .create(LocalSupplier::new(company_id.clone(), selling_item_template))
            .await?;
        info!(id = %supplier.id, item = %supplier.item_id, "local supplier created");
        Ok(supplier)
    }

    pub async fn get_local_supplier(&self, id: &EntityId) -> SimResult<LocalSupplier> {
        self.suppliers.read(id).await
    }

    /// Cut `amount` from a copy of the template and credit `price` to the NPC company.
    ///
    /// The stored template is never reduced.
    pub async fn sell_item(
        &self,
        supplier_id: &EntityId,
        group_id: &EntityId,
        amount: Decimal,
        price: Decimal,
    ) -> SimResult<ItemGroup> {
        let supplier = self.suppliers.read(supplier_id).await?;
        let mut template = supplier.selling_item_template;
        if &template.group_id != group_id {
            return Err(SimError::not_found("ItemGroup", group_id.as_str()));
        }
        let taken = template.take(amount)?;
        self.company.gain_revenue(&supplier.company_id, price).await?;
        Ok(taken)
    }

    pub async fn check_items(&self, supplier_id: &EntityId) -> SimResult<Vec<ItemGroup>> {
        Ok(vec![self.get_local_supplier(supplier_id).await?.selling_item_template])
    }
}
