//! Carry-forward filling of missing days in a ledger.
//!
//! Every function here only inserts records for days that have none; existing
//! records are never overwritten or removed. Each returns the number of records
//! it inserted.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::ledger::Ledger;

/// Extends the ledger through `target`, carrying the latest balance forward.
///
/// Does nothing on an empty ledger or when the ledger already reaches `target`.
pub fn fill_forward(ledger: &mut Ledger, target: NaiveDate) -> usize {
    let Some(last) = ledger.latest() else {
        return 0;
    };
    if last.date >= target {
        return 0;
    }
    fill_between(ledger, last.date, target, last.amount)
}

/// Inserts `amount` for every empty day in `(after, through]`.
pub fn fill_between(
    ledger: &mut Ledger,
    after: NaiveDate,
    through: NaiveDate,
    amount: Decimal,
) -> usize {
    let mut inserted = 0;
    for day in after.iter_days().skip(1).take_while(|day| *day <= through) {
        if ledger.get(day).is_none() {
            ledger.upsert(day, amount);
            inserted += 1;
        }
    }
    inserted
}

/// Inserts `amount` for every day from `from` up to, but not including, the
/// ledger's current earliest date.
///
/// There is no earlier balance to anchor to, so the caller decides what the
/// synthesized days hold. Does nothing on an empty ledger or when `from` is not
/// earlier than the first record.
pub fn fill_backward(ledger: &mut Ledger, from: NaiveDate, amount: Decimal) -> usize {
    let Some(first) = ledger.earliest_date() else {
        return 0;
    };
    let mut inserted = 0;
    for day in from.iter_days().take_while(|day| *day < first) {
        ledger.upsert(day, amount);
        inserted += 1;
    }
    inserted
}

/// Fills holes between existing records with the balance of the record before
/// each hole. Ledgers written by this crate never have holes, but imported or
/// legacy data may.
pub fn close_gaps(ledger: &mut Ledger) -> usize {
    if ledger.is_contiguous() {
        return 0;
    }

    let holes: Vec<_> = {
        let mut records = ledger.records().peekable();
        let mut holes = Vec::new();
        while let Some(current) = records.next() {
            if let Some(next) = records.peek() {
                if (next.date - current.date).num_days() > 1 {
                    holes.push((current, next.date));
                }
            }
        }
        holes
    };

    let mut inserted = 0;
    for (before, next_date) in holes {
        if let Some(through) = next_date.pred_opt() {
            inserted += fill_between(ledger, before.date, through, before.amount);
        }
    }
    inserted
}

/// Makes the ledger cover every day from `min(earliest, target)` through
/// `max(latest, target)`.
///
/// Days before the first record take `anchor`, since nothing earlier is known.
pub fn ensure_coverage(ledger: &mut Ledger, target: NaiveDate, anchor: Decimal) -> usize {
    let mut inserted = close_gaps(ledger);
    match ledger.earliest_date() {
        Some(first) if target < first => {
            inserted += fill_backward(ledger, target, anchor);
        }
        _ => {}
    }
    inserted + fill_forward(ledger, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BalanceRecord;

    fn d(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn forward_fill_carries_latest_balance_to_target() {
        let mut ledger =
            Ledger::from_records([BalanceRecord::new(d("2023-04-13"), Decimal::from(800))]);

        let inserted = fill_forward(&mut ledger, d("2023-04-16"));

        assert_eq!(inserted, 3);
        assert!(ledger.is_contiguous());
        assert_eq!(ledger.latest_date(), Some(d("2023-04-16")));
        assert!(ledger.records().all(|r| r.amount == Decimal::from(800)));
    }

    #[test]
    fn forward_fill_is_noop_when_current_or_empty() {
        let mut empty = Ledger::new();
        assert_eq!(fill_forward(&mut empty, d("2023-04-16")), 0);
        assert!(empty.is_empty());

        let mut ledger =
            Ledger::from_records([BalanceRecord::new(d("2023-04-16"), Decimal::from(1))]);
        assert_eq!(fill_forward(&mut ledger, d("2023-04-16")), 0);
        assert_eq!(fill_forward(&mut ledger, d("2023-04-01")), 0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn backward_fill_stops_before_old_earliest() {
        let mut ledger =
            Ledger::from_records([BalanceRecord::new(d("2023-04-10"), Decimal::from(100))]);

        let inserted = fill_backward(&mut ledger, d("2023-04-07"), Decimal::from(5));

        assert_eq!(inserted, 3);
        assert_eq!(ledger.get(d("2023-04-07")), Some(Decimal::from(5)));
        assert_eq!(ledger.get(d("2023-04-09")), Some(Decimal::from(5)));
        assert_eq!(ledger.get(d("2023-04-10")), Some(Decimal::from(100)));
    }

    #[test]
    fn close_gaps_carries_previous_balance_into_holes() {
        let mut ledger = Ledger::from_records([
            BalanceRecord::new(d("2023-04-10"), Decimal::from(800)),
            BalanceRecord::new(d("2023-04-11"), Decimal::from(1000)),
            BalanceRecord::new(d("2023-04-13"), Decimal::from(1100)),
            BalanceRecord::new(d("2023-04-16"), Decimal::from(900)),
        ]);

        let inserted = close_gaps(&mut ledger);

        assert_eq!(inserted, 3);
        assert!(ledger.is_contiguous());
        assert_eq!(ledger.get(d("2023-04-12")), Some(Decimal::from(1000)));
        assert_eq!(ledger.get(d("2023-04-14")), Some(Decimal::from(1100)));
        assert_eq!(ledger.get(d("2023-04-15")), Some(Decimal::from(1100)));
        assert_eq!(ledger.get(d("2023-04-16")), Some(Decimal::from(900)));
    }

    #[test]
    fn ensure_coverage_extends_both_directions() {
        let mut ledger =
            Ledger::from_records([BalanceRecord::new(d("2023-04-10"), Decimal::from(100))]);

        ensure_coverage(&mut ledger, d("2023-04-12"), Decimal::ZERO);
        assert_eq!(ledger.earliest_date(), Some(d("2023-04-10")));
        assert_eq!(ledger.latest_date(), Some(d("2023-04-12")));

        ensure_coverage(&mut ledger, d("2023-04-08"), Decimal::ZERO);
        assert_eq!(ledger.earliest_date(), Some(d("2023-04-08")));
        assert_eq!(ledger.get(d("2023-04-09")), Some(Decimal::ZERO));
        assert!(ledger.is_contiguous());
    }
}
