use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ledger::Ledger;

/// One day's balance on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub date: NaiveDate,
    #[serde(rename = "balance")]
    pub amount: Decimal,
}

impl BalanceRecord {
    pub fn new(date: NaiveDate, amount: Decimal) -> Self {
        Self { date, amount }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub Uuid);

impl CardId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A credit card and the balance ledger it owns.
///
/// `user_id` only points back at the owner for reverse lookups; the user's
/// lifetime is managed by the store, which deletes cards along with their owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub user_id: UserId,
    pub number: String,
    pub issuance_bank: Option<String>,
    pub ledger: Ledger,
}

/// A balance correction as it arrives from the outside world.
///
/// The date is optional because transports may omit it; a missing date is
/// rejected when the update is applied rather than defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdate {
    pub credit_card_number: String,
    #[serde(default)]
    pub balance_date: Option<NaiveDate>,
    pub balance_amount: Decimal,
}

impl BalanceUpdate {
    pub fn new(card_number: impl Into<String>, date: NaiveDate, amount: Decimal) -> Self {
        Self {
            credit_card_number: card_number.into(),
            balance_date: Some(date),
            balance_amount: amount,
        }
    }
}
