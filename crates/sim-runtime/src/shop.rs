use crate::auth::AuthContext;
use crate::company::CompanyService;
use rust_decimal::Decimal;
use sim_core::{
    EntityId, ItemGroup, ItemStorage, MemoryRepository, Query, SaleEntry, Shop, ShopPatch,
    SimConfig, SimResult,
};
use sim_econ::construction_price;
use std::sync::Arc;
use tracing::{info, warn};

/// One shop listing as the retail market sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct Listing {
    pub shop_id: EntityId,
    pub company_id: EntityId,
    pub item_id: String,
    pub item_group_id: EntityId,
    pub price: Decimal,
    pub size: Decimal,
    /// Units currently in the listed group.
    pub available: Decimal,
}

pub struct ShopService {
    shops: Arc<MemoryRepository<Shop>>,
    company: Arc<CompanyService>,
    config: Arc<SimConfig>,
}

impl ShopService {
    pub fn new(
        shops: Arc<MemoryRepository<Shop>>,
        company: Arc<CompanyService>,
        config: Arc<SimConfig>,
    ) -> Self {
        Self {
            shops,
            company,
            config,
        }
    }

    pub fn construction_price(&self, size: Decimal, storage_volume: Decimal) -> SimResult<Decimal> {
        Ok(construction_price(
            size,
            storage_volume,
            self.config.shop_price_per_size,
            self.config.shop_price_per_storage_volume,
        )?)
    }

    /// Build a shop after a guarded withdrawal of its price.
    pub async fn create_shop(
        &self,
        auth: &AuthContext,
        company_id: &EntityId,
        size: Decimal,
        storage_volume: Decimal,
    ) -> SimResult<Shop> {
        let price = self.construction_price(size, storage_volume)?;
        self.company.use_cash_one_time(company_id, price).await?;
        let shop = self
            .shops
            .create(Shop::new(company_id.clone(), size, ItemStorage::new(storage_volume)))
            .await?;
        info!(%auth, id = %shop.id, %company_id, %price, "shop built");
        Ok(shop)
    }

    pub async fn get_shop(&self, id: &EntityId) -> SimResult<Shop> {
        self.shops.read(id).await
    }

    pub async fn shops_of_company(&self, company_id: &EntityId) -> SimResult<Vec<Shop>> {
        let q = Query::all().eq("company_id", company_id);
        Ok(self.shops.query(&q).await?.into_items())
    }

    /// Replace the shop's listings. Every entry must name a stored group of its item type.
    pub async fn set_selling(
        &self,
        auth: &AuthContext,
        shop_id: &EntityId,
        selling: Vec<SaleEntry>,
    ) -> SimResult<Shop> {
        let n = selling.len();
        let shop = self
            .shops
            .update(
                shop_id,
                ShopPatch {
                    selling: Some(selling),
                },
            )
            .await?;
        info!(%auth, id = %shop_id, listings = n, "shop listings set");
        Ok(shop)
    }

    pub async fn buy_item(&self, shop_id: &EntityId, group: ItemGroup, price: Decimal) -> SimResult<EntityId> {
        let (shop, group_id) = self
            .shops
            .mutate(shop_id, |s| s.storage.add_item_group(group))
            .await?;
        self.company.use_cash_fixed(&shop.company_id, price).await?;
        Ok(group_id)
    }

    pub async fn sell_item(
        &self,
        shop_id: &EntityId,
        group_id: &EntityId,
        amount: Decimal,
        price: Decimal,
    ) -> SimResult<ItemGroup> {
        let (shop, taken) = self
            .shops
            .mutate(shop_id, |s| s.storage.take_items(group_id, amount))
            .await?;
        self.company.gain_revenue(&shop.company_id, price).await?;
        Ok(taken)
    }

    pub async fn check_items(&self, shop_id: &EntityId) -> SimResult<Vec<ItemGroup>> {
        Ok(self.get_shop(shop_id).await?.storage.items().to_vec())
    }

    /// Every listing of every shop, in shop creation order.
    pub async fn selling_data(&self) -> SimResult<Vec<Listing>> {
        let shops = self.shops.query(&Query::all()).await?.into_items();
        let mut listings = Vec::new();
        for shop in shops {
            for entry in &shop.selling {
                let group = match shop.storage.item_group(&entry.item_group_id) {
                    Ok(g) => g,
                    Err(e) => {
                        warn!(shop = %shop.id, group = %entry.item_group_id, error = %e, "listing without stock group");
                        continue;
                    }
                };
                listings.push(Listing {
                    shop_id: shop.id.clone(),
                    company_id: shop.company_id.clone(),
                    item_id: entry.item_id.clone(),
                    item_group_id: entry.item_group_id.clone(),
                    price: entry.price,
                    size: shop.size,
                    available: group.amount,
                });
            }
        }
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{ItemLibrary, SimError};

    async fn setup() -> (ShopService, Arc<CompanyService>, EntityId) {
        let company = Arc::new(CompanyService::new(Arc::new(MemoryRepository::new())));
        let c = company
            .create_company(&AuthContext::system(), "Retail Co", Decimal::from(1_000_000))
            .await
            .unwrap();
        let svc = ShopService::new(
            Arc::new(MemoryRepository::new()),
            company.clone(),
            Arc::new(SimConfig::default()),
        );
        (svc, company, c.id)
    }

    fn rings(amount: i64) -> ItemGroup {
        let def = ItemLibrary::builtin().get("goldRing").unwrap().clone();
        ItemGroup::new(def, Decimal::from(amount))
    }

    #[tokio::test]
    async fn shop_costs_size_and_volume() {
        let (svc, company, cid) = setup().await;
        svc.create_shop(&AuthContext::system(), &cid, Decimal::ONE, Decimal::from(10))
            .await
            .unwrap();
        assert_eq!(company.get_company(&cid).await.unwrap().cash, Decimal::from(590_000));
        assert!(svc
            .create_shop(&AuthContext::system(), &cid, Decimal::from(2), Decimal::ONE)
            .await
            .is_err());
        assert_eq!(svc.shops_of_company(&cid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listings_expose_stock() {
        let (svc, _, cid) = setup().await;
        let auth = AuthContext::system();
        let shop = svc.create_shop(&auth, &cid, Decimal::ONE, Decimal::from(10)).await.unwrap();
        let gid = svc.buy_item(&shop.id, rings(40), Decimal::ZERO).await.unwrap();
        svc.set_selling(
            &auth,
            &shop.id,
            vec![SaleEntry { item_id: "goldRing".into(), item_group_id: gid.clone(), price: Decimal::from(300) }],
        )
        .await
        .unwrap();

        let listings = svc.selling_data().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].available, Decimal::from(40));
        assert_eq!(listings[0].size, Decimal::ONE);

        svc.sell_item(&shop.id, &gid, Decimal::from(4), Decimal::from(1_200)).await.unwrap();
        assert_eq!(svc.selling_data().await.unwrap()[0].available, Decimal::from(36));
    }

    #[tokio::test]
    async fn invalid_listing_is_rejected_without_change() {
        let (svc, _, cid) = setup().await;
        let auth = AuthContext::system();
        let shop = svc.create_shop(&auth, &cid, Decimal::ONE, Decimal::from(10)).await.unwrap();
        let gid = svc.buy_item(&shop.id, rings(1), Decimal::ZERO).await.unwrap();
        let err = svc
            .set_selling(
                &auth,
                &shop.id,
                vec![SaleEntry { item_id: "watch".into(), item_group_id: gid, price: Decimal::ONE }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidOperation { .. }));
        assert!(svc.get_shop(&shop.id).await.unwrap().selling.is_empty());
    }

    #[tokio::test]
    async fn same_group_cannot_be_listed_twice() {
        let (svc, _, cid) = setup().await;
        let auth = AuthContext::system();
        let shop = svc.create_shop(&auth, &cid, Decimal::ONE, Decimal::from(10)).await.unwrap();
        let gid = svc.buy_item(&shop.id, rings(10), Decimal::ZERO).await.unwrap();
        let entry = SaleEntry { item_id: "goldRing".into(), item_group_id: gid, price: Decimal::from(100) };
        let err = svc
            .set_selling(&auth, &shop.id, vec![entry.clone(), entry])
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidOperation { .. }));
        assert!(svc.selling_data().await.unwrap().is_empty());
    }
}
