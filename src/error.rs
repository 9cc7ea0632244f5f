use chrono::NaiveDate;

use crate::domain::UserId;

/// Errors surfaced by the ledger service and the card store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No card is registered under the given number.
    #[error("Credit card not found for number: {0}")]
    CardNotFound(String),

    /// A correction arrived without a date.
    #[error("Balance update is missing a date")]
    InvalidDate,

    /// A correction is dated after the reference day. Applying it would leave
    /// the ledger ending somewhere other than today.
    #[error("{date} is after today ({today}), which is not allowed")]
    FutureDate { date: NaiveDate, today: NaiveDate },

    /// A correction would push a balance past what `Decimal` can hold.
    #[error("Balance correction at {date} is out of range")]
    AmountOutOfRange { date: NaiveDate },

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Credit card number already registered: {0}")]
    DuplicateCardNumber(String),

    /// The persistence layer failed. Nothing was written for the failing call.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
