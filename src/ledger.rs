use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use crate::domain::BalanceRecord;

/// Date-indexed balances for a single card.
///
/// Records are kept in a `BTreeMap` so they are always sorted by date and
/// unique per day. Iteration is ascending; `history()` is most-recent-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    records: BTreeMap<NaiveDate, Decimal>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from stored rows. A later row for the same date wins.
    pub fn from_records(records: impl IntoIterator<Item = BalanceRecord>) -> Self {
        let mut ledger = Self::new();
        for r in records {
            ledger.upsert(r.date, r.amount);
        }
        ledger
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<Decimal> {
        self.records.get(&date).copied()
    }

    /// Returns the record with the greatest date at or before `date`.
    pub fn closest_previous(&self, date: NaiveDate) -> Option<BalanceRecord> {
        self.records
            .range(..=date)
            .next_back()
            .map(|(d, a)| BalanceRecord::new(*d, *a))
    }

    /// Inserts or overwrites the record at `date`. Does not gap-fill.
    pub fn upsert(&mut self, date: NaiveDate, amount: Decimal) {
        self.records.insert(date, amount);
    }

    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.records.keys().next().copied()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.keys().next_back().copied()
    }

    pub fn latest(&self) -> Option<BalanceRecord> {
        self.records
            .iter()
            .next_back()
            .map(|(d, a)| BalanceRecord::new(*d, *a))
    }

    /// All records, earliest first.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = BalanceRecord> + '_ {
        self.records.iter().map(|(d, a)| BalanceRecord::new(*d, *a))
    }

    /// All records, most recent first.
    pub fn history(&self) -> Vec<BalanceRecord> {
        self.records().rev().collect()
    }

    /// Adds `delta` to every record dated strictly after `date` and returns
    /// how many records were touched.
    ///
    /// Returns `None` and leaves every record as it was if any shifted amount
    /// would overflow.
    pub fn adjust_after(&mut self, date: NaiveDate, delta: Decimal) -> Option<usize> {
        let shifted = self
            .records
            .range((Excluded(date), Unbounded))
            .map(|(day, amount)| amount.checked_add(delta).map(|a| (*day, a)))
            .collect::<Option<Vec<_>>>()?;
        let touched = shifted.len();
        self.records.extend(shifted);
        Some(touched)
    }

    /// True when there is exactly one record for every day between the
    /// earliest and latest dates.
    ///
    /// Keys are unique and sorted, so comparing the span against the record
    /// count is enough.
    pub fn is_contiguous(&self) -> bool {
        match (self.earliest_date(), self.latest_date()) {
            (Some(first), Some(last)) => {
                let span = (last - first).num_days() + 1;
                span == self.records.len() as i64
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
    }

    fn sparse() -> Ledger {
        Ledger::from_records([
            BalanceRecord::new(d("2023-04-10"), Decimal::from(800)),
            BalanceRecord::new(d("2023-04-13"), Decimal::from(1100)),
            BalanceRecord::new(d("2023-04-16"), Decimal::from(900)),
        ])
    }

    #[test]
    fn closest_previous_returns_exact_or_earlier_record() {
        let ledger = sparse();

        assert_eq!(
            ledger.closest_previous(d("2023-04-15")),
            Some(BalanceRecord::new(d("2023-04-13"), Decimal::from(1100)))
        );
        assert_eq!(
            ledger.closest_previous(d("2023-04-13")),
            Some(BalanceRecord::new(d("2023-04-13"), Decimal::from(1100)))
        );
        assert_eq!(
            ledger.closest_previous(d("2023-05-01")),
            Some(BalanceRecord::new(d("2023-04-16"), Decimal::from(900)))
        );
        assert_eq!(ledger.closest_previous(d("2023-04-09")), None);
        assert_eq!(Ledger::new().closest_previous(d("2023-04-09")), None);
    }

    #[test]
    fn history_is_most_recent_first_and_records_ascending() {
        let ledger = sparse();

        let asc: Vec<_> = ledger.records().map(|r| r.date).collect();
        assert_eq!(asc, vec![d("2023-04-10"), d("2023-04-13"), d("2023-04-16")]);

        let desc: Vec<_> = ledger.history().into_iter().map(|r| r.date).collect();
        assert_eq!(desc, vec![d("2023-04-16"), d("2023-04-13"), d("2023-04-10")]);

        assert_eq!(ledger.earliest_date(), Some(d("2023-04-10")));
        assert_eq!(ledger.latest_date(), Some(d("2023-04-16")));
    }

    #[test]
    fn upsert_overwrites_same_day() {
        let mut ledger = sparse();
        ledger.upsert(d("2023-04-13"), Decimal::from(5));

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.get(d("2023-04-13")), Some(Decimal::from(5)));
        assert_eq!(ledger.get(d("2023-04-14")), None);
    }

    #[test]
    fn adjust_after_skips_the_pivot_and_earlier_days() {
        let mut ledger = sparse();
        let touched = ledger.adjust_after(d("2023-04-13"), Decimal::from(-100));

        assert_eq!(touched, Some(1));
        assert_eq!(ledger.get(d("2023-04-10")), Some(Decimal::from(800)));
        assert_eq!(ledger.get(d("2023-04-13")), Some(Decimal::from(1100)));
        assert_eq!(ledger.get(d("2023-04-16")), Some(Decimal::from(800)));
    }

    #[test]
    fn adjust_after_overflow_changes_nothing() {
        let mut ledger = sparse();
        ledger.upsert(d("2023-04-17"), Decimal::MAX);
        let before = ledger.clone();

        assert_eq!(ledger.adjust_after(d("2023-04-10"), Decimal::ONE), None);
        assert_eq!(ledger, before);
    }

    #[test]
    fn contiguity_check() {
        assert!(Ledger::new().is_contiguous());
        assert!(!sparse().is_contiguous());

        let full = Ledger::from_records([
            BalanceRecord::new(d("2023-04-10"), Decimal::from(1)),
            BalanceRecord::new(d("2023-04-11"), Decimal::from(1)),
            BalanceRecord::new(d("2023-04-12"), Decimal::from(1)),
        ]);
        assert!(full.is_contiguous());
    }
}
