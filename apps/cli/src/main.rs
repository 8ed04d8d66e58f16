#![deny(warnings)]

//! Headless CLI: seeds a small gold-ring economy and advances it turn by turn.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sim_core::{EntityId, FirmRef, FirmType, SaleEntry, SimConfig, SupplyStatus};
use sim_runtime::{AuthContext, Game, WholesaleMarketService};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<String>,
    turns: u32,
    save: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args {
        config: None,
        turns: 10,
        save: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next(),
            "--turns" => {
                if let Some(n) = it.next().and_then(|s| s.parse().ok()) {
                    args.turns = n;
                }
            }
            "--save" => args.save = it.next(),
            _ => {}
        }
    }
    args
}

fn load_config(path: Option<&str>) -> Result<SimConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config {path}"))?;
            Ok(serde_yaml::from_str(&text).with_context(|| format!("invalid config {path}"))?)
        }
        None => Ok(SimConfig::default()),
    }
}

/// The player's firms and how far the demo has progressed.
struct Demo {
    auth: AuthContext,
    company_id: EntityId,
    factory: FirmRef,
    shop: Option<FirmRef>,
    selling: bool,
}

impl Demo {
    async fn setup(game: &Game) -> Result<Self> {
        let auth = AuthContext::player("demo", None);
        let company = game
            .company
            .create_company(&auth, "Demo Jewellers", Decimal::from(10_000_000))
            .await?;
        let auth = AuthContext::player("demo", Some(company.id.clone()));
        let factory = game
            .factory
            .create_factory(&auth, &company.id, Decimal::ONE, Decimal::from(10))
            .await?;
        game.factory
            .set_factory_process(&auth, &factory.id, Some("goldRing"))
            .await?;
        let factory = FirmRef::new(company.id.clone(), FirmType::Factory, factory.id);

        let gold = game
            .wholesale
            .query_suppliers(&WholesaleMarketService::supplier_query().eq("product_id", "gold"))
            .await?
            .into_items();
        let gold = gold.first().context("no local gold supply configured")?;
        game.wholesale
            .create_contract(&auth, &gold.id, factory.clone(), Decimal::from(1_000), None)
            .await?;

        Ok(Self {
            auth,
            company_id: company.id,
            factory,
            shop: None,
            selling: false,
        })
    }

    /// Open a shop once rings exist, then list them once they reach the shop.
    async fn advance(&mut self, game: &Game) -> Result<()> {
        if self.shop.is_none() {
            let f = game.factory.get_factory(&self.factory.firm_id).await?;
            let Some(rings) = f.storage.item_groups_of_type("goldRing").next() else {
                return Ok(());
            };
            let supply = game
                .wholesale
                .register_supply(&self.auth, self.factory.clone(), &rings.group_id, Decimal::from(300), SupplyStatus::Private)
                .await?;
            let shop = game
                .shop
                .create_shop(&self.auth, &self.company_id, Decimal::ONE, Decimal::from(10))
                .await?;
            let shop = FirmRef::new(self.company_id.clone(), FirmType::Shop, shop.id);
            game.wholesale
                .create_contract(&self.auth, &supply.id, shop.clone(), Decimal::from(40), None)
                .await?;
            self.shop = Some(shop);
        } else if let (Some(shop), false) = (&self.shop, self.selling) {
            let s = game.shop.get_shop(&shop.firm_id).await?;
            if let Some(rings) = s.storage.item_groups_of_type("goldRing").next() {
                let entry = SaleEntry {
                    item_id: "goldRing".into(),
                    item_group_id: rings.group_id.clone(),
                    price: Decimal::from(300),
                };
                game.shop.set_selling(&self.auth, &shop.firm_id, vec![entry]).await?;
                self.selling = true;
            };
        }
        Ok(())
    }

    async fn report(&self, game: &Game, turn: u32) -> Result<()> {
        let state = game.global_state.get_state().await?;
        let company = game.company.get_company(&self.company_id).await?;
        let f = game.factory.get_factory(&self.factory.firm_id).await?;
        let shop_rings = match &self.shop {
            Some(s) => game
                .shop
                .get_shop(&s.firm_id)
                .await?
                .storage
                .total_amount_of_type("goldRing"),
            None => Decimal::ZERO,
        };
        println!(
            "KPI | turn: {} | date: {} | cash: {} | gold: {} | factory rings: {} | shop rings: {}",
            turn,
            state.game_date,
            company.cash,
            f.storage.total_amount_of_type("gold"),
            f.storage.total_amount_of_type("goldRing"),
            shop_rings
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(
        config = ?args.config,
        turns = args.turns,
        git_sha = env!("GIT_SHA"),
        build_date = env!("BUILD_DATE"),
        "starting CLI"
    );

    let config = load_config(args.config.as_deref())?;
    let game = Game::new(config)?;
    game.initialize().await?;

    let mut demo = Demo::setup(&game).await?;
    for turn in 1..=args.turns {
        game.progress_turn().await?;
        demo.report(&game, turn).await?;
        demo.advance(&game).await?;
    }

    if let Some(url) = args.save {
        let pool = persistence::init_db(&url).await?;
        game.save(&pool, "demo").await?;
        println!("Saved to {url}");
    }
    Ok(())
}
