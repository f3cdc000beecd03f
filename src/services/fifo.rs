//! Pure FIFO arithmetic shared by allocation and returns.

use crate::entities::batch_log::SaleUnit;
use rust_decimal::{Decimal, RoundingStrategy};

/// A planned draw from the batch at `index` in FIFO order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub index: usize,
    pub quantity: Decimal,
}

/// Walks `capacities` oldest-first taking `min(remaining, capacity)` from each
/// until `needed` is covered.
///
/// Returns the shortfall when the capacities together cannot cover `needed`.
pub fn plan_draws(capacities: &[Decimal], needed: Decimal) -> Result<Vec<Draw>, Decimal> {
    let mut remaining = needed;
    let mut draws = Vec::new();

    for (index, capacity) in capacities.iter().copied().enumerate() {
        if remaining <= Decimal::ZERO {
            break;
        }
        if capacity <= Decimal::ZERO {
            continue;
        }
        let quantity = remaining.min(capacity);
        draws.push(Draw { index, quantity });
        remaining -= quantity;
    }

    if remaining > Decimal::ZERO {
        Err(remaining)
    } else {
        Ok(draws)
    }
}

/// Share of `line_amount` attributed to `drawn` out of `line_quantity`,
/// rounded half-up to 2 decimal places.
pub fn prorate(line_amount: Decimal, drawn: Decimal, line_quantity: Decimal) -> Decimal {
    if line_quantity.is_zero() {
        return Decimal::ZERO;
    }
    (line_amount * drawn / line_quantity).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Cost of a batch expressed per piece, per pack, and per sale unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostBasis {
    pub piece: Decimal,
    pub pack: Decimal,
    pub unit_cost: Decimal,
}

impl CostBasis {
    /// `piece_cost` is the batch's per-piece snapshot.
    pub fn new(piece_cost: Decimal, pieces_per_pack: Decimal, unit: SaleUnit) -> Self {
        let pieces_per_pack = if pieces_per_pack > Decimal::ZERO {
            pieces_per_pack
        } else {
            Decimal::ONE
        };
        let pack = piece_cost * pieces_per_pack;
        let unit_cost = match unit {
            SaleUnit::Piece => piece_cost,
            SaleUnit::Pack => pack,
        };
        Self {
            piece: piece_cost,
            pack,
            unit_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn draws_oldest_first() {
        let draws = plan_draws(&[dec!(5), dec!(10)], dec!(12)).unwrap();
        assert_eq!(
            draws,
            vec![
                Draw { index: 0, quantity: dec!(5) },
                Draw { index: 1, quantity: dec!(7) },
            ]
        );
    }

    #[test]
    fn skips_empty_batches() {
        let draws = plan_draws(&[dec!(0), dec!(4)], dec!(3)).unwrap();
        assert_eq!(draws, vec![Draw { index: 1, quantity: dec!(3) }]);
    }

    #[test]
    fn reports_shortfall() {
        assert_eq!(plan_draws(&[dec!(5), dec!(10)], dec!(20)), Err(dec!(5)));
        assert_eq!(plan_draws(&[], dec!(1)), Err(dec!(1)));
    }

    #[test]
    fn prorates_to_cents() {
        assert_eq!(prorate(dec!(100), dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(prorate(dec!(100), dec!(2), dec!(3)), dec!(66.67));
        assert_eq!(prorate(dec!(120), dec!(5), dec!(12)), dec!(50));
    }

    #[test]
    fn pack_cost_uses_conversion_factor() {
        let basis = CostBasis::new(dec!(2.5), dec!(12), SaleUnit::Pack);
        assert_eq!(basis.pack, dec!(30));
        assert_eq!(basis.unit_cost, dec!(30));

        let basis = CostBasis::new(dec!(2.5), dec!(12), SaleUnit::Piece);
        assert_eq!(basis.unit_cost, dec!(2.5));
    }
}
