use crate::EconError;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// One participant in a distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct Claim {
    /// Most this claim can absorb; `None` is unbounded.
    pub capacity: Option<Decimal>,
    /// Share of the pool relative to the other claims.
    pub weight: Decimal,
}

impl Claim {
    pub fn bounded(capacity: Decimal, weight: Decimal) -> Self {
        Self {
            capacity: Some(capacity),
            weight,
        }
    }

    pub fn unbounded(weight: Decimal) -> Self {
        Self {
            capacity: None,
            weight,
        }
    }
}

/// Result of [`distribute`]. `allocations[i]` belongs to `claims[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Distribution {
    pub allocations: Vec<Decimal>,
    /// Part of the pool nobody received.
    pub unsold: Decimal,
}

/// Split `total` whole units across `claims` proportionally to weight,
/// filling the smallest claims first.
///
/// Claims are visited by `capacity / weight` ascending (unbounded last, ties in
/// input order). While a claim's proportional share of what is left covers its
/// whole capacity it is satisfied in full and leaves the pool. Every claim left
/// after that gets `floor(remaining * weight / remaining_weight)`. Zero-weight
/// claims get nothing. Allocations never exceed capacity and never sum past
/// `total`; when every claim is bounded and the capacities fit in `total`, all
/// of them are satisfied.
pub fn distribute(total: Decimal, claims: &[Claim]) -> Result<Distribution, EconError> {
    if total < Decimal::ZERO {
        return Err(EconError::NegativeAmount(total));
    }
    let mut order = Vec::with_capacity(claims.len());
    for (i, c) in claims.iter().enumerate() {
        if c.weight < Decimal::ZERO {
            return Err(EconError::NegativeWeight(c.weight));
        }
        let per_weight = match c.capacity {
            Some(cap) if cap < Decimal::ZERO => return Err(EconError::NegativeAmount(cap)),
            Some(cap) if c.weight > Decimal::ZERO => {
                Some(cap.checked_div(c.weight).ok_or(EconError::Overflow)?)
            }
            _ => None,
        };
        if c.weight > Decimal::ZERO {
            order.push((i, per_weight));
        }
    }
    order.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut allocations = vec![Decimal::ZERO; claims.len()];
    let mut remaining = total;
    let mut remaining_weight: Decimal = order.iter().map(|&(i, _)| claims[i].weight).sum();

    let mut split_from = order.len();
    for (pos, &(i, _)) in order.iter().enumerate() {
        let claim = &claims[i];
        let Some(cap) = claim.capacity else {
            split_from = pos;
            break;
        };
        let share = remaining
            .checked_mul(claim.weight)
            .ok_or(EconError::Overflow)?;
        let need = cap.checked_mul(remaining_weight).ok_or(EconError::Overflow)?;
        if share < need {
            split_from = pos;
            break;
        }
        allocations[i] = cap;
        remaining -= cap;
        remaining_weight -= claim.weight;
    }

    let mut left = remaining;
    if remaining_weight > Decimal::ZERO {
        for &(i, _) in &order[split_from..] {
            let claim = &claims[i];
            let mut share = remaining
                .checked_mul(claim.weight)
                .and_then(|v| v.checked_div(remaining_weight))
                .ok_or(EconError::Overflow)?
                .floor();
            if let Some(cap) = claim.capacity {
                share = share.min(cap);
            }
            share = share.min(left);
            allocations[i] = share;
            left -= share;
        }
    }

    Ok(Distribution {
        allocations,
        unsold: left,
    })
}
