use std::collections::HashMap;

use crate::domain::{Card, CardId, UserId};
use crate::error::Error;
use crate::ledger::Ledger;

/// Where cards and their ledgers live.
pub trait CardStore {
    fn find_card_by_number(&self, number: &str) -> Result<Option<Card>, Error>;

    /// Loads the card, runs `apply` on it and persists the result.
    ///
    /// The load and the save form one critical section: no other writer, in
    /// this process or another, can change the card in between. When `apply`
    /// fails nothing is written. A missing card is `CardNotFound`.
    fn update_card<R>(
        &mut self,
        number: &str,
        apply: impl FnOnce(&mut Card) -> Result<R, Error>,
    ) -> Result<R, Error>;
}

/// In-process card store keyed by card number.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cards: HashMap<String, Card>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an empty card for `user_id` and returns its id.
    pub fn add_card(&mut self, user_id: UserId, number: &str) -> Result<CardId, Error> {
        if self.cards.contains_key(number) {
            return Err(Error::DuplicateCardNumber(number.to_string()));
        }
        let card = Card {
            id: CardId::new(),
            user_id,
            number: number.to_string(),
            issuance_bank: None,
            ledger: Ledger::new(),
        };
        let id = card.id;
        self.cards.insert(card.number.clone(), card);
        Ok(id)
    }
}

impl CardStore for MemoryStore {
    fn find_card_by_number(&self, number: &str) -> Result<Option<Card>, Error> {
        Ok(self.cards.get(number).cloned())
    }

    fn update_card<R>(
        &mut self,
        number: &str,
        apply: impl FnOnce(&mut Card) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let card = self
            .cards
            .get_mut(number)
            .ok_or_else(|| Error::CardNotFound(number.to_string()))?;
        let mut next = card.clone();
        let out = apply(&mut next)?;
        *card = next;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn failed_update_keeps_the_stored_card() {
        let mut store = MemoryStore::new();
        store.add_card(UserId::new(), "4111").expect("card");
        let day = NaiveDate::from_ymd_opt(2023, 4, 10).expect("date");

        let err = store
            .update_card("4111", |card| {
                card.ledger.upsert(day, Decimal::ONE);
                Err::<(), _>(Error::InvalidDate)
            })
            .expect_err("closure error");

        assert!(matches!(err, Error::InvalidDate));
        let card = store.find_card_by_number("4111").expect("lookup").expect("card");
        assert!(card.ledger.is_empty());
    }

    #[test]
    fn update_of_unknown_card_is_card_not_found() {
        let mut store = MemoryStore::new();

        let err = store.update_card("9999", |_| Ok(())).expect_err("unknown card");

        assert!(matches!(err, Error::CardNotFound(ref n) if n == "9999"));
    }
}
