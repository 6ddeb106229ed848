//! Settlement plan construction.
//!
//! The venue nets matched long/short quantity pairs; a plan must draw the
//! same total from each side. Positions are consumed in the order the
//! account endpoint reports them, shorts first.

use tracing::debug;

use perpmm_core::{Position, PositionSide, SettlementEntry, SettlementPlan};

use crate::error::{SettlementError, SettlementResult};

/// Build a balanced settlement plan from the account's open positions.
///
/// `max_settleable = min(Σ long qty, Σ short qty)`; when zero the plan is
/// empty and carries the reason. The balance check at the end asserts the
/// construction; `PlanUnbalanced` is unreachable short of a logic bug.
pub fn build_plan(positions: &[Position]) -> SettlementResult<SettlementPlan> {
    let (longs, shorts): (Vec<&Position>, Vec<&Position>) = positions
        .iter()
        .filter(|p| p.quantity > 0)
        .partition(|p| p.side == PositionSide::Long);

    let total_long: u64 = longs.iter().map(|p| p.quantity).sum();
    let total_short: u64 = shorts.iter().map(|p| p.quantity).sum();
    let max_settleable = total_long.min(total_short);

    if max_settleable == 0 {
        return Ok(SettlementPlan::skipped(format!(
            "no settleable (L={total_long}, S={total_short})"
        )));
    }

    let mut entries = Vec::new();
    let mut short_settled = 0u64;
    let mut long_settled = 0u64;

    for (group, settled) in [(&shorts, &mut short_settled), (&longs, &mut long_settled)] {
        let mut remaining = max_settleable;
        for position in group.iter() {
            if remaining == 0 {
                break;
            }
            let quantity = position.quantity.min(remaining);
            entries.push(SettlementEntry {
                position_id: position.id.clone(),
                quantity,
            });
            remaining -= quantity;
            *settled += quantity;
        }
    }

    if short_settled != long_settled {
        return Err(SettlementError::PlanUnbalanced {
            long: long_settled,
            short: short_settled,
        });
    }

    debug!(
        entries = entries.len(),
        settleable = max_settleable,
        total_long,
        total_short,
        "Settlement plan built"
    );

    Ok(SettlementPlan {
        entries,
        skip_reason: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(id: &str, qty: u64) -> Position {
        Position {
            id: id.into(),
            side: PositionSide::Long,
            quantity: qty,
            entry_price: 0,
        }
    }

    fn short(id: &str, qty: u64) -> Position {
        Position {
            id: id.into(),
            side: PositionSide::Short,
            quantity: qty,
            entry_price: 0,
        }
    }

    #[test]
    fn test_balanced_allocation() {
        // longs 100+80=180, shorts 150+20=170 => settle 170 each side
        let positions = vec![long("L1", 100), long("L2", 80), short("S1", 150), short("S2", 20)];
        let plan = build_plan(&positions).unwrap();

        let entries: Vec<(&str, u64)> = plan
            .entries
            .iter()
            .map(|e| (e.position_id.as_str(), e.quantity))
            .collect();
        assert_eq!(
            entries,
            vec![("S1", 150), ("S2", 20), ("L1", 100), ("L2", 70)]
        );
        assert_eq!(plan.total_quantity(), 340); // 170 per side
        assert!(plan.skip_reason.is_none());
    }

    #[test]
    fn test_quantity_conservation() {
        let positions = vec![
            long("L1", 33),
            long("L2", 67),
            long("L3", 5),
            short("S1", 40),
            short("S2", 41),
        ];
        let plan = build_plan(&positions).unwrap();

        let short_sum: u64 = plan
            .entries
            .iter()
            .filter(|e| e.position_id.starts_with('S'))
            .map(|e| e.quantity)
            .sum();
        let long_sum: u64 = plan
            .entries
            .iter()
            .filter(|e| e.position_id.starts_with('L'))
            .map(|e| e.quantity)
            .sum();

        assert_eq!(short_sum, long_sum);
        assert_eq!(short_sum, 81); // min(105, 81)
    }

    #[test]
    fn test_one_sided_book_skips() {
        let positions = vec![long("L1", 50)];
        let plan = build_plan(&positions).unwrap();

        assert!(plan.is_empty());
        assert_eq!(plan.skip_reason.as_deref(), Some("no settleable (L=50, S=0)"));
    }

    #[test]
    fn test_no_positions_skips() {
        let plan = build_plan(&[]).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.skip_reason.as_deref(), Some("no settleable (L=0, S=0)"));
    }

    #[test]
    fn test_zero_quantity_positions_ignored() {
        let positions = vec![long("L1", 0), short("S1", 10)];
        let plan = build_plan(&positions).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.skip_reason.as_deref(), Some("no settleable (L=0, S=10)"));
    }

    #[test]
    fn test_exact_match_settles_everything() {
        let positions = vec![long("L1", 60), short("S1", 60)];
        let plan = build_plan(&positions).unwrap();
        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.total_quantity(), 120);
    }
}
