use rust_decimal::Decimal;
use sim_core::{FactoryProcess, ItemGroup, ItemLibrary, ItemStorage, SimError, SimResult};
use tracing::debug;

/// What one manufacturing turn did.
#[derive(Clone, Debug, PartialEq)]
pub struct ManufactureOutcome {
    /// Process units completed.
    pub units: Decimal,
    /// Running cost to charge the owning company.
    pub cost: Decimal,
}

impl ManufactureOutcome {
    pub fn idle() -> Self {
        Self {
            units: Decimal::ZERO,
            cost: Decimal::ZERO,
        }
    }
}

/// Run `process` once over `storage` for a factory of the given `size`.
///
/// The unit count is the floor of the smallest of three bounds: on-hand
/// materials, `throughput * size`, and free volume over the net volume one
/// unit adds (only when that is positive). Inputs are drained from their
/// groups in storage order; emptied groups stay in place. Outputs merge into
/// existing groups of the same item.
///
/// On error `storage` may be partially updated; callers run this on a
/// scratch copy.
pub fn manufacture(
    storage: &mut ItemStorage,
    process: &FactoryProcess,
    size: Decimal,
    items: &ItemLibrary,
) -> SimResult<ManufactureOutcome> {
    let mut bound = process.throughput * size;

    for input in &process.input {
        if input.amount <= Decimal::ZERO {
            continue;
        }
        let on_hand = storage.total_amount_of_type(&input.id);
        bound = bound.min(on_hand / input.amount);
    }

    let mut net_volume = Decimal::ZERO;
    for b in &process.output {
        net_volume += items.get(&b.id)?.volume * b.amount;
    }
    for b in &process.input {
        net_volume -= items.get(&b.id)?.volume * b.amount;
    }
    if net_volume > Decimal::ZERO {
        bound = bound.min(storage.free_volume() / net_volume);
    }

    let units = bound.floor().max(Decimal::ZERO);
    if units.is_zero() {
        return Ok(ManufactureOutcome::idle());
    }

    for input in &process.input {
        let mut need = input.amount * units;
        for group in storage.item_groups_of_type_mut(&input.id) {
            if need.is_zero() {
                break;
            }
            let taken = group.amount.min(need);
            group.amount -= taken;
            need -= taken;
        }
        if need > Decimal::ZERO {
            return Err(SimError::unexpected(format!(
                "material bound allowed {units} units but {} ran short by {need}",
                input.id
            )));
        }
    }

    for output in &process.output {
        let def = items.get(&output.id)?.clone();
        storage.add_item_group(ItemGroup::new(def, output.amount * units))?;
    }

    debug!(process = %process.id, %units, "manufactured");
    Ok(ManufactureOutcome {
        units,
        cost: process.manufacturing_cost * units,
    })
}
