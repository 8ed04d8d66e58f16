use criterion::{criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use sim_core::{FirmRef, FirmType, SimConfig};
use sim_runtime::{AuthContext, Game, WholesaleMarketService};

async fn seeded_game(factories: usize) -> Game {
    let game = Game::new(SimConfig::default()).unwrap();
    game.initialize().await.unwrap();
    let auth = AuthContext::system();
    let gold = game
        .wholesale
        .query_suppliers(&WholesaleMarketService::supplier_query().eq("product_id", "gold"))
        .await
        .unwrap()
        .into_items()
        .remove(0);
    let company = game
        .company
        .create_company(&auth, "Bench", Decimal::from(1_000_000_000_000i64))
        .await
        .unwrap();
    for _ in 0..factories {
        let f = game
            .factory
            .create_factory(&auth, &company.id, Decimal::ONE, Decimal::from(1_000_000))
            .await
            .unwrap();
        game.factory
            .set_factory_process(&auth, &f.id, Some("goldRing"))
            .await
            .unwrap();
        let firm = FirmRef::new(company.id.clone(), FirmType::Factory, f.id);
        game.wholesale
            .create_contract(&auth, &gold.id, firm, Decimal::from(200), None)
            .await
            .unwrap();
    }
    game
}

fn bench_turns(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let game = rt.block_on(seeded_game(100));
    c.bench_function("progress_turn_100_factories", |b| {
        b.iter(|| {
            let _ = rt.block_on(game.progress_turn());
        })
    });
}

criterion_group!(benches, bench_turns);
criterion_main!(benches);
