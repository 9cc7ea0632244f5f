use crate::config::{AppConfig, AppPaths};
use crate::domain::{BalanceRecord, Card, CardId, User, UserId};
use crate::error::Error;
use crate::ledger::Ledger;
use crate::store::CardStore;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(paths: &AppPaths, cfg: &AppConfig) -> Result<(Self, PathBuf)> {
        let db_path = paths.data_dir.join(&cfg.database_file);
        let db = Self::open_path(&db_path)?;
        Ok((db, db_path))
    }

    pub fn open_path(db_path: &Path) -> Result<Self> {
        ensure_parent_dir(db_path)?;
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open DB {}", db_path.display()))?;
        // Writers from other processes queue on the lock instead of failing.
        conn.busy_timeout(Duration::from_secs(5)).context("Failed to set busy timeout")?;

        let db = Self { conn };
        db.migrate()?;
        tracing::debug!(path = %db_path.display(), "Opened database");
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                number TEXT NOT NULL,
                issuance_bank TEXT,
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_cards_number ON cards(number);
            CREATE INDEX IF NOT EXISTS idx_cards_user_id ON cards(user_id);

            CREATE TABLE IF NOT EXISTS balances (
                card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
                date TEXT NOT NULL,
                amount TEXT NOT NULL,
                PRIMARY KEY (card_id, date)
            );
            "#,
        )?;
        Ok(())
    }

    pub fn create_user(&self, name: &str, email: &str) -> Result<User> {
        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.conn.execute(
            "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                Utc::now().to_rfc3339()
            ],
        )?;
        tracing::info!(user = %user.id, "Created user");
        Ok(user)
    }

    pub fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT name, email FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        Ok(row.map(|(name, email)| User { id, name, email }))
    }

    /// Deletes the user together with their cards and ledgers.
    pub fn delete_user(&self, id: UserId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        if deleted > 0 {
            tracing::info!(user = %id, "Deleted user");
        }
        Ok(deleted > 0)
    }

    pub fn add_card(
        &self,
        user_id: UserId,
        number: &str,
        issuance_bank: Option<&str>,
    ) -> Result<Card, Error> {
        if self.find_user(user_id)?.is_none() {
            return Err(Error::UserNotFound(user_id));
        }
        if card_row_by_number(&self.conn, number)?.is_some() {
            return Err(Error::DuplicateCardNumber(number.to_string()));
        }

        let card = Card {
            id: CardId::new(),
            user_id,
            number: number.to_string(),
            issuance_bank: issuance_bank.map(str::to_string),
            ledger: Ledger::new(),
        };
        self.conn
            .execute(
                r#"
                INSERT INTO cards (id, user_id, number, issuance_bank, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    card.id.to_string(),
                    user_id.to_string(),
                    card.number,
                    card.issuance_bank,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("Failed to insert card")?;
        tracing::info!(user = %user_id, card = %card.id, "Added card");
        Ok(card)
    }

    /// Deletes the card and its ledger.
    pub fn delete_card(&self, number: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM cards WHERE number = ?1", params![number])?;
        Ok(deleted > 0)
    }

    /// Every card owned by `user_id`, oldest first. Unknown users have none.
    pub fn list_cards(&self, user_id: UserId) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, number, issuance_bank
            FROM cards
            WHERE user_id = ?1
            ORDER BY created_at ASC, number ASC
            "#,
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            let id: String = row.get(0)?;
            let number: String = row.get(1)?;
            let issuance_bank: Option<String> = row.get(2)?;
            Ok((id, number, issuance_bank))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, number, issuance_bank) = row?;
            let id = CardId(Uuid::parse_str(&id).context("Invalid card UUID in DB")?);
            let ledger = load_ledger(&self.conn, id)?;
            out.push(Card {
                id,
                user_id,
                number,
                issuance_bank,
                ledger,
            });
        }
        Ok(out)
    }

    pub fn user_id_for_card(&self, number: &str) -> Result<Option<UserId>> {
        Ok(card_row_by_number(&self.conn, number)?.map(|row| row.user_id))
    }
}

struct CardRow {
    id: CardId,
    user_id: UserId,
    issuance_bank: Option<String>,
}

fn card_row_by_number(conn: &Connection, number: &str) -> Result<Option<CardRow>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, issuance_bank FROM cards WHERE number = ?1",
            params![number],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((id, user_id, issuance_bank)) = row else {
        return Ok(None);
    };
    Ok(Some(CardRow {
        id: CardId(Uuid::parse_str(&id).context("Invalid card UUID in DB")?),
        user_id: UserId(Uuid::parse_str(&user_id).context("Invalid user UUID in DB")?),
        issuance_bank,
    }))
}

fn load_ledger(conn: &Connection, card_id: CardId) -> Result<Ledger> {
    let mut stmt =
        conn.prepare("SELECT date, amount FROM balances WHERE card_id = ?1 ORDER BY date ASC")?;

    let rows = stmt.query_map(params![card_id.to_string()], |row| {
        let date: NaiveDate = row.get(0)?;
        let amount: String = row.get(1)?;
        Ok((date, amount))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (date, amount) = row?;
        let amount = amount
            .parse::<Decimal>()
            .context("Invalid decimal amount in balances table")?;
        records.push(BalanceRecord::new(date, amount));
    }
    Ok(Ledger::from_records(records))
}

fn load_card(conn: &Connection, number: &str) -> Result<Option<Card>> {
    let Some(row) = card_row_by_number(conn, number)? else {
        return Ok(None);
    };
    let ledger = load_ledger(conn, row.id)?;
    Ok(Some(Card {
        id: row.id,
        user_id: row.user_id,
        number: number.to_string(),
        issuance_bank: row.issuance_bank,
        ledger,
    }))
}

/// Swaps the card's stored rows for its in-memory ledger. Callers own the
/// surrounding transaction.
fn write_ledger(conn: &Connection, card: &Card) -> Result<()> {
    conn.execute(
        "DELETE FROM balances WHERE card_id = ?1",
        params![card.id.to_string()],
    )?;
    let mut stmt =
        conn.prepare("INSERT INTO balances (card_id, date, amount) VALUES (?1, ?2, ?3)")?;
    let card_id = card.id.to_string();
    for record in card.ledger.records() {
        stmt.execute(params![card_id, record.date, record.amount.to_string()])?;
    }
    Ok(())
}

impl CardStore for Db {
    fn find_card_by_number(&self, number: &str) -> Result<Option<Card>, Error> {
        Ok(load_card(&self.conn, number).with_context(|| format!("Failed to load card {number}"))?)
    }

    fn update_card<R>(
        &mut self,
        number: &str,
        apply: impl FnOnce(&mut Card) -> Result<R, Error>,
    ) -> Result<R, Error> {
        // IMMEDIATE takes the write lock before the read. Dropping `tx` without
        // committing rolls back.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to start ledger transaction")?;
        let mut card = load_card(&tx, number)
            .with_context(|| format!("Failed to load card {number}"))?
            .ok_or_else(|| Error::CardNotFound(number.to_string()))?;

        let out = apply(&mut card)?;

        write_ledger(&tx, &card)
            .with_context(|| format!("Failed to save ledger for card {number}"))?;
        tx.commit().context("Failed to commit ledger")?;
        Ok(out)
    }
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    Ok(())
}
