use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "cardledger")]
#[command(about = "Credit card balance ledger", long_about = None)]
pub struct Cli {
    /// Override CardLedger home directory (config/data subdirs will be created inside it).
    #[arg(long, env = "CARDLEDGER_HOME", global = true)]
    pub home: Option<std::path::PathBuf>,

    /// Pin the reference day (YYYY-MM-DD) instead of reading the clock.
    #[arg(long, env = "CARDLEDGER_TODAY", global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    User(UserArgs),
    Card(CardArgs),
    Balance(BalanceArgs),
}

#[derive(Debug, Subcommand)]
pub enum UserCmd {
    /// Create a user and print its id.
    Create { name: String, email: String },
    /// Delete a user along with their cards and balance history.
    Delete { user_id: Uuid },
}

#[derive(Debug, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub cmd: UserCmd,
}

#[derive(Debug, Subcommand)]
pub enum CardCmd {
    /// Register a card for a user and print its id.
    Add {
        user_id: Uuid,
        number: String,
        #[arg(long)]
        bank: Option<String>,
    },
    /// List the cards of a user.
    List { user_id: Uuid },
    /// Print the id of the user owning a card.
    Owner { number: String },
    /// Delete a card and its balance history.
    Delete { number: String },
}

#[derive(Debug, Args)]
pub struct CardArgs {
    #[command(subcommand)]
    pub cmd: CardCmd,
}

#[derive(Debug, Subcommand)]
pub enum BalanceCmd {
    /// Set the balance of a card on a given day.
    Update {
        number: String,
        date: NaiveDate,
        #[arg(allow_hyphen_values = true)]
        amount: Decimal,
    },
    /// Apply a JSON array of updates from a file ("-" reads stdin).
    Batch {
        file: String,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the balance for today.
    Show { number: String },
    /// Print the balance history, most recent first.
    History {
        number: String,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Args)]
pub struct BalanceArgs {
    #[command(subcommand)]
    pub cmd: BalanceCmd,
}
