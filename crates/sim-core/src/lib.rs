#![deny(warnings)]

//! Core domain models and invariants for the market simulation.
//!
//! This crate holds the persisted entities, the embedded item storage, the
//! static catalogs, the error taxonomy, the simulation config and the
//! generic in-memory repository every service reads and writes through.

pub mod catalog;
pub mod config;
pub mod error;
pub mod id;
pub mod item;
pub mod model;
pub mod repository;

pub use catalog::{
    FactoryProcess, FactoryProcessLibrary, ItemBatch, ItemLibrary, RetailCompetitor,
    RetailMarketData, RetailMarketLibrary,
};
pub use config::{LocalSupplySeed, SimConfig};
pub use error::{SimError, SimResult};
pub use id::EntityId;
pub use item::{ItemDefinition, ItemGroup, ItemStorage};
pub use model::*;
pub use repository::{
    Entity, FieldUpdate, FieldValue, Filter, FilterOp, MemoryRepository, Query, QueryResult,
    SortKey, DEFAULT_QUERY_LIMIT,
};
