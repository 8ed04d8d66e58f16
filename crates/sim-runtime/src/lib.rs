#![deny(warnings)]

//! Async runtime for the market simulation.
//!
//! Services wrap the repositories from `sim-core` and the math from
//! `sim-econ`; [`TurnProgressSystem`] runs their per-turn steps in a fixed
//! order and [`Game`] wires everything together.

mod auth;
mod company;
mod factory;
mod game;
mod generator;
mod global_state;
mod local_supplier;
mod retail;
mod shop;
mod turn;
mod wholesale;

pub use auth::AuthContext;
pub use company::CompanyService;
pub use factory::FactoryService;
pub use game::{Game, Repositories};
pub use generator::{LocalSupplierGenerator, LOCAL_SUPPLIER_COMPANY_NAME};
pub use global_state::GlobalStateContainer;
pub use local_supplier::LocalSupplierService;
pub use retail::RetailMarketService;
pub use shop::{Listing, ShopService};
pub use turn::{
    TurnCallback, TurnProgressSystem, TurnStepFuture, FACTORY_STEP, RETAIL_SALE_STEP, TURN_STEPS,
    WHOLESALE_STEP,
};
pub use wholesale::WholesaleMarketService;
