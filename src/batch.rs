use serde::Serialize;
use std::fmt;

use crate::clock::Clock;
use crate::domain::BalanceUpdate;
use crate::error::Error;
use crate::service::LedgerService;
use crate::store::CardStore;
use crate::update::UpdateSummary;

/// Result of one item in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated {
        card_number: String,
        summary: UpdateSummary,
    },
    CardNotFound {
        card_number: String,
    },
    Rejected {
        card_number: String,
        reason: String,
    },
}

impl UpdateOutcome {
    pub fn card_number(&self) -> &str {
        match self {
            UpdateOutcome::Updated { card_number, .. }
            | UpdateOutcome::CardNotFound { card_number }
            | UpdateOutcome::Rejected { card_number, .. } => card_number,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UpdateOutcome::Updated { .. })
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Updated { card_number, .. } => {
                write!(f, "Balance updated successfully for card number: {card_number}.")
            }
            UpdateOutcome::CardNotFound { card_number } => {
                write!(f, "Credit card not found for number: {card_number}.")
            }
            UpdateOutcome::Rejected {
                card_number,
                reason,
            } => write!(f, "Balance update rejected for card number: {card_number}: {reason}."),
        }
    }
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<UpdateOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(f, "{outcome}")?;
        }
        Ok(())
    }
}

impl<S: CardStore, C: Clock> LedgerService<S, C> {
    /// Applies each update in order. A failing item is recorded and the batch
    /// moves on; it never undoes or blocks the others.
    pub fn apply_batch(&mut self, updates: &[BalanceUpdate]) -> BatchReport {
        let mut report = BatchReport::default();
        for update in updates {
            let card_number = update.credit_card_number.clone();
            let outcome = match self.apply_update(update) {
                Ok(summary) => UpdateOutcome::Updated {
                    card_number,
                    summary,
                },
                Err(Error::CardNotFound(_)) => {
                    tracing::warn!(card = %card_number, "Credit card not found");
                    UpdateOutcome::CardNotFound { card_number }
                }
                Err(err) => {
                    tracing::warn!(card = %card_number, "Balance update rejected: {err:#}");
                    UpdateOutcome::Rejected {
                        card_number,
                        reason: format!("{err:#}"),
                    }
                }
            };
            report.outcomes.push(outcome);
        }
        report
    }
}
