#![deny(warnings)]

//! Economic models: pricing, market clearing and manufacturing for the simulation.
//!
//! Everything here is synchronous and free of I/O. The runtime services load
//! entities, call into these helpers and write the results back.
//! - Construction pricing for factories and shops
//! - Retail rating and supply weight of a listing
//! - The fill-small-first [`distribute`] algorithm shared by both markets
//! - The per-turn [`manufacture`] step over one factory's storage

mod distribution;
mod manufacture;

pub use distribution::{distribute, Claim, Distribution};
pub use manufacture::{manufacture, ManufactureOutcome};

use rust_decimal::Decimal;
use sim_core::SimError;
use thiserror::Error;

/// Errors produced by economic helpers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EconError {
    /// Reference prices must be strictly positive.
    #[error("invalid reference price: {0}")]
    InvalidPrice(Decimal),
    /// Amounts, sizes and volumes must be non-negative.
    #[error("negative amount: {0}")]
    NegativeAmount(Decimal),
    /// Claim weights must be non-negative.
    #[error("negative weight: {0}")]
    NegativeWeight(Decimal),
    #[error("decimal overflow")]
    Overflow,
}

impl From<EconError> for SimError {
    fn from(e: EconError) -> Self {
        SimError::invalid(e.to_string())
    }
}

/// Construction price of a firm: `size * per_size + storage_volume * per_volume`.
///
/// Example:
/// let p = construction_price(Decimal::ONE, Decimal::from(10), Decimal::from(100_000), Decimal::from(1_000)).unwrap();
/// assert_eq!(p, Decimal::from(110_000));
pub fn construction_price(
    size: Decimal,
    storage_volume: Decimal,
    per_size: Decimal,
    per_volume: Decimal,
) -> Result<Decimal, EconError> {
    for v in [size, storage_volume] {
        if v < Decimal::ZERO {
            return Err(EconError::NegativeAmount(v));
        }
    }
    let a = size.checked_mul(per_size).ok_or(EconError::Overflow)?;
    let b = storage_volume
        .checked_mul(per_volume)
        .ok_or(EconError::Overflow)?;
    a.checked_add(b).ok_or(EconError::Overflow)
}

/// Retail rating of a listing: `50 + 40 * (1 - price / base_price)`.
///
/// Selling at the base price rates 50; every base price of markup costs 40.
pub fn retail_rating(price: Decimal, base_price: Decimal) -> Result<Decimal, EconError> {
    if base_price <= Decimal::ZERO {
        return Err(EconError::InvalidPrice(base_price));
    }
    let ratio = price.checked_div(base_price).ok_or(EconError::Overflow)?;
    Decimal::ONE
        .checked_sub(ratio)
        .and_then(|d| d.checked_mul(Decimal::from(40)))
        .and_then(|d| d.checked_add(Decimal::from(50)))
        .ok_or(EconError::Overflow)
}

/// Supply weight `size * rating^2`, or `None` when the listing rates at or below zero.
pub fn supply_weight(size: Decimal, rating: Decimal) -> Result<Option<Decimal>, EconError> {
    if size < Decimal::ZERO {
        return Err(EconError::NegativeAmount(size));
    }
    if rating <= Decimal::ZERO {
        return Ok(None);
    }
    let squared = rating.checked_mul(rating).ok_or(EconError::Overflow)?;
    Ok(Some(size.checked_mul(squared).ok_or(EconError::Overflow)?))
}
