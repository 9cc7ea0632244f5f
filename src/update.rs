//! Single-day balance corrections.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Error;
use crate::gap_fill::{ensure_coverage, fill_forward};
use crate::ledger::Ledger;

/// What a correction did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    /// Balance at the corrected date before the correction, after carry-forward.
    pub previous: Decimal,
    pub delta: Decimal,
    /// Records after the corrected date that received `delta`.
    pub propagated: usize,
    /// Records synthesized by gap filling.
    pub filled: usize,
}

/// Sets the balance at `date` to `balance` and shifts every later day by the
/// difference from the previous (possibly carried-forward) balance.
///
/// The ledger is brought up to `today` afterwards. Days before the first known
/// record are treated as having had a zero balance. All work happens in memory;
/// persisting the result is the caller's job. On error the ledger is unchanged.
pub fn apply_correction(
    ledger: &mut Ledger,
    date: NaiveDate,
    balance: Decimal,
    today: NaiveDate,
) -> Result<UpdateSummary, Error> {
    if date > today {
        return Err(Error::FutureDate { date, today });
    }

    if ledger.is_empty() {
        ledger.upsert(date, balance);
        let filled = fill_forward(ledger, today);
        tracing::debug!(%date, filled, "started ledger");
        return Ok(UpdateSummary {
            previous: Decimal::ZERO,
            delta: balance,
            propagated: 0,
            filled,
        });
    }

    // Changes land on a copy so an overflow part way through leaves `ledger` alone.
    let mut next = ledger.clone();
    let mut filled = ensure_coverage(&mut next, date, Decimal::ZERO);
    let previous = next.get(date).unwrap_or(Decimal::ZERO);
    let delta = balance
        .checked_sub(previous)
        .ok_or(Error::AmountOutOfRange { date })?;

    next.upsert(date, balance);
    let propagated = if delta.is_zero() {
        0
    } else {
        next.adjust_after(date, delta).ok_or(Error::AmountOutOfRange { date })?
    };

    filled += fill_forward(&mut next, today);
    *ledger = next;
    tracing::debug!(%date, %previous, %delta, propagated, filled, "applied correction");

    Ok(UpdateSummary {
        previous,
        delta,
        propagated,
        filled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BalanceRecord;

    fn d(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
    }

    fn amounts(ledger: &Ledger) -> Vec<(NaiveDate, Decimal)> {
        ledger.history().into_iter().map(|r| (r.date, r.amount)).collect()
    }

    #[test]
    fn correction_between_records_propagates_to_later_days() {
        let mut ledger = Ledger::from_records([
            BalanceRecord::new(d("2023-04-12"), Decimal::from(110)),
            BalanceRecord::new(d("2023-04-10"), Decimal::from(100)),
        ]);

        let summary =
            apply_correction(&mut ledger, d("2023-04-11"), Decimal::from(110), d("2023-04-12"))
                .expect("apply");

        assert_eq!(summary.previous, Decimal::from(100));
        assert_eq!(summary.delta, Decimal::from(10));
        assert_eq!(summary.propagated, 1);
        assert_eq!(
            amounts(&ledger),
            vec![
                (d("2023-04-12"), Decimal::from(120)),
                (d("2023-04-11"), Decimal::from(110)),
                (d("2023-04-10"), Decimal::from(100)),
            ]
        );
    }

    #[test]
    fn first_correction_fills_through_today() {
        let mut ledger = Ledger::new();

        let summary =
            apply_correction(&mut ledger, d("2023-04-13"), Decimal::from(800), d("2023-04-16"))
                .expect("apply");

        assert_eq!(summary.filled, 3);
        assert_eq!(ledger.len(), 4);
        assert!(ledger.is_contiguous());
        assert_eq!(ledger.latest_date(), Some(d("2023-04-16")));
        assert!(ledger.records().all(|r| r.amount == Decimal::from(800)));
    }

    #[test]
    fn correction_before_history_backfills_and_shifts_existing_days() {
        let mut ledger = Ledger::from_records([
            BalanceRecord::new(d("2023-04-10"), Decimal::from(100)),
            BalanceRecord::new(d("2023-04-11"), Decimal::from(150)),
        ]);

        let summary =
            apply_correction(&mut ledger, d("2023-04-07"), Decimal::from(20), d("2023-04-11"))
                .expect("apply");

        assert_eq!(summary.previous, Decimal::ZERO);
        assert_eq!(summary.delta, Decimal::from(20));
        assert_eq!(summary.filled, 3);
        assert_eq!(ledger.get(d("2023-04-07")), Some(Decimal::from(20)));
        assert_eq!(ledger.get(d("2023-04-08")), Some(Decimal::from(20)));
        assert_eq!(ledger.get(d("2023-04-09")), Some(Decimal::from(20)));
        assert_eq!(ledger.get(d("2023-04-10")), Some(Decimal::from(120)));
        assert_eq!(ledger.get(d("2023-04-11")), Some(Decimal::from(170)));
        assert!(ledger.is_contiguous());
    }

    #[test]
    fn correction_after_latest_carries_forward_first() {
        let mut ledger =
            Ledger::from_records([BalanceRecord::new(d("2023-04-10"), Decimal::from(100))]);

        let summary =
            apply_correction(&mut ledger, d("2023-04-13"), Decimal::from(40), d("2023-04-15"))
                .expect("apply");

        assert_eq!(summary.previous, Decimal::from(100));
        assert_eq!(summary.delta, Decimal::from(-60));
        assert_eq!(summary.propagated, 0);
        assert_eq!(ledger.get(d("2023-04-12")), Some(Decimal::from(100)));
        assert_eq!(ledger.get(d("2023-04-13")), Some(Decimal::from(40)));
        assert_eq!(ledger.get(d("2023-04-15")), Some(Decimal::from(40)));
        assert!(ledger.is_contiguous());
    }

    #[test]
    fn future_dates_are_rejected_without_mutation() {
        let mut ledger =
            Ledger::from_records([BalanceRecord::new(d("2023-04-10"), Decimal::from(100))]);
        let before = ledger.clone();

        let err =
            apply_correction(&mut ledger, d("2023-04-20"), Decimal::from(1), d("2023-04-12"))
                .expect_err("future date");

        assert!(matches!(err, Error::FutureDate { .. }));
        assert_eq!(ledger, before);
    }

    #[test]
    fn overflowing_delta_is_rejected_without_mutation() {
        let mut ledger = Ledger::new();
        apply_correction(&mut ledger, d("2023-04-10"), Decimal::MAX, d("2023-04-10"))
            .expect("seed");
        let before = ledger.clone();

        let err = apply_correction(&mut ledger, d("2023-04-10"), Decimal::MIN, d("2023-04-10"))
            .expect_err("overflow");

        assert!(matches!(err, Error::AmountOutOfRange { date } if date == d("2023-04-10")));
        assert_eq!(ledger, before);
    }

    #[test]
    fn overflow_in_later_days_is_rejected_without_mutation() {
        let mut ledger = Ledger::from_records([
            BalanceRecord::new(d("2023-04-10"), Decimal::ZERO),
            BalanceRecord::new(d("2023-04-11"), Decimal::ZERO),
            BalanceRecord::new(d("2023-04-12"), Decimal::MAX),
        ]);
        let before = ledger.clone();

        let err = apply_correction(&mut ledger, d("2023-04-10"), Decimal::ONE, d("2023-04-12"))
            .expect_err("overflow");

        assert!(matches!(err, Error::AmountOutOfRange { .. }));
        assert_eq!(ledger, before);
    }
}
