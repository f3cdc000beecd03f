//! Property-based tests for the FIFO arithmetic.
//!
//! Quantities are generated as whole and fractional decimals so draws and
//! prorated prices are checked across batch layouts a fixed scenario would miss.

use proptest::prelude::*;
use rust_decimal::Decimal;
use stockledger::{
    entities::batch_log::SaleUnit,
    services::fifo::{plan_draws, prorate, CostBasis},
};

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000, 0u32..3).prop_map(|(units, scale)| Decimal::new(units, scale))
}

fn capacities_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(quantity_strategy(), 0..12)
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn draws_cover_exactly_what_is_needed(
        capacities in capacities_strategy(),
        needed in quantity_strategy(),
    ) {
        let total: Decimal = capacities.iter().copied().sum();
        match plan_draws(&capacities, needed) {
            Ok(draws) => {
                let drawn: Decimal = draws.iter().map(|d| d.quantity).sum();
                prop_assert_eq!(drawn, needed);
                prop_assert!(total >= needed);
            }
            Err(shortfall) => {
                prop_assert!(total < needed);
                prop_assert_eq!(shortfall, needed - total);
            }
        }
    }

    #[test]
    fn draws_respect_batch_capacity_and_order(
        capacities in capacities_strategy(),
        needed in quantity_strategy(),
    ) {
        if let Ok(draws) = plan_draws(&capacities, needed) {
            let mut last_index = None;
            for draw in &draws {
                prop_assert!(draw.quantity > Decimal::ZERO);
                prop_assert!(draw.quantity <= capacities[draw.index]);
                if let Some(last) = last_index {
                    prop_assert!(draw.index > last);
                }
                last_index = Some(draw.index);
            }
            // Every batch before the last one drawn is emptied.
            if let Some(last) = last_index {
                for draw in draws.iter().filter(|d| d.index < last) {
                    prop_assert_eq!(draw.quantity, capacities[draw.index]);
                }
            }
        }
    }

    #[test]
    fn prorated_shares_sum_to_line_amount(
        capacities in prop::collection::vec(1i64..500, 1..8),
        amount in amount_strategy(),
    ) {
        let capacities: Vec<Decimal> = capacities.into_iter().map(Decimal::from).collect();
        let line_quantity: Decimal = capacities.iter().copied().sum();
        let draws = plan_draws(&capacities, line_quantity).expect("capacities cover the line");

        let shares: Decimal = draws
            .iter()
            .map(|d| prorate(amount, d.quantity, line_quantity))
            .sum();
        let tolerance = Decimal::new(5, 3) * Decimal::from(draws.len() as i64);
        prop_assert!((shares - amount).abs() <= tolerance);
    }

    #[test]
    fn pack_cost_is_piece_cost_times_pack_size(
        piece_cents in 0i64..100_000,
        pieces_per_pack in 1i64..500,
    ) {
        let piece = Decimal::new(piece_cents, 2);
        let pack_size = Decimal::from(pieces_per_pack);
        let basis = CostBasis::new(piece, pack_size, SaleUnit::Pack);
        prop_assert_eq!(basis.piece, piece);
        prop_assert_eq!(basis.pack, piece * pack_size);
        prop_assert_eq!(basis.unit_cost, basis.pack);
    }
}
