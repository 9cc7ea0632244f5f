use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::domain::{BalanceRecord, BalanceUpdate, Card};
use crate::error::Error;
use crate::store::CardStore;
use crate::update::{UpdateSummary, apply_correction};

/// Entry point for reading and correcting card ledgers.
///
/// Mutations take `&mut self`, so updates through one service are serialized.
/// Updates through different services meet in the store, which serializes
/// them per card.
pub struct LedgerService<S, C> {
    store: S,
    clock: C,
}

impl<S: CardStore, C: Clock> LedgerService<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Applies one correction and persists the card's ledger.
    ///
    /// The store loads, corrects and saves the card as one unit, so a failing
    /// call leaves storage as it was and concurrent writers cannot drop each
    /// other's corrections.
    pub fn apply_update(&mut self, update: &BalanceUpdate) -> Result<UpdateSummary, Error> {
        let date = update.balance_date.ok_or(Error::InvalidDate)?;
        let today = self.clock.today();
        let summary = self
            .store
            .update_card(&update.credit_card_number, |card| {
                apply_correction(&mut card.ledger, date, update.balance_amount, today)
            })?;

        tracing::info!(
            card = %update.credit_card_number,
            %date,
            balance = %update.balance_amount,
            delta = %summary.delta,
            "Balance updated"
        );
        Ok(summary)
    }

    /// Balance on the reference day, or zero for a card with no history on or
    /// before it.
    pub fn current_balance(&self, card_number: &str) -> Result<Decimal, Error> {
        let card = self.find_card(card_number)?;
        let today = self.clock.today();
        Ok(card
            .ledger
            .closest_previous(today)
            .map(|r| r.amount)
            .unwrap_or(Decimal::ZERO))
    }

    /// The card's records, most recent first.
    pub fn history(&self, card_number: &str) -> Result<Vec<BalanceRecord>, Error> {
        Ok(self.find_card(card_number)?.ledger.history())
    }

    fn find_card(&self, number: &str) -> Result<Card, Error> {
        self.store
            .find_card_by_number(number)?
            .ok_or_else(|| Error::CardNotFound(number.to_string()))
    }
}
