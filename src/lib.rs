//! Per-card balance ledgers that stay contiguous up to today.
//!
//! The [`ledger::Ledger`] holds one balance per day. [`update::apply_correction`]
//! rewrites a past day and carries the difference forward, and
//! [`service::LedgerService`] ties that to a [`store::CardStore`] and a
//! [`clock::Clock`]. [`db::Db`] is the SQLite-backed store used by the CLI.

pub mod batch;
pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gap_fill;
pub mod ledger;
pub mod service;
pub mod store;
pub mod update;

pub use error::Error;
