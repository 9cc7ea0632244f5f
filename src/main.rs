mod cli;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::io::Read;
use tracing_subscriber::EnvFilter;

use cardledger::batch::BatchReport;
use cardledger::clock::{Clock, FixedClock, SystemClock};
use cardledger::config::{AppConfig, app_paths, load_or_init_config};
use cardledger::db::Db;
use cardledger::domain::{BalanceUpdate, UserId};
use cardledger::service::LedgerService;

use crate::cli::{BalanceCmd, CardCmd, Cli, Command, UserCmd};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = app_paths(cli.home.clone())?;
    let (cfg, _cfg_path) = load_or_init_config(&paths)?;
    init_logging(&cfg);

    let clock: Box<dyn Clock> = match cli.today {
        Some(day) => Box::new(FixedClock(day)),
        None => Box::new(SystemClock::new(cfg.today_source)),
    };
    let (db, db_path) = Db::open(&paths, &cfg)?;
    tracing::debug!(db = %db_path.display(), today = %clock.today(), "Starting");

    match cli.command {
        Command::User(args) => handle_user(&db, args.cmd),
        Command::Card(args) => handle_card(&db, args.cmd),
        Command::Balance(args) => handle_balance(LedgerService::new(db, clock), args.cmd),
    }
}

fn init_logging(cfg: &AppConfig) {
    let filter = EnvFilter::try_from_env("CARDLEDGER_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_user(db: &Db, cmd: UserCmd) -> Result<()> {
    match cmd {
        UserCmd::Create { name, email } => {
            let user = db.create_user(&name, &email)?;
            println!("{}", user.id);
        }
        UserCmd::Delete { user_id } => {
            if !db.delete_user(UserId(user_id))? {
                return Err(anyhow!("User not found: {user_id}"));
            }
            println!("User deleted successfully");
        }
    }
    Ok(())
}

fn handle_card(db: &Db, cmd: CardCmd) -> Result<()> {
    match cmd {
        CardCmd::Add {
            user_id,
            number,
            bank,
        } => {
            let card = db.add_card(UserId(user_id), &number, bank.as_deref())?;
            println!("{}", card.id);
        }
        CardCmd::List { user_id } => {
            let cards = db.list_cards(UserId(user_id))?;
            if cards.is_empty() {
                println!("(no cards)");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = cards
                .iter()
                .map(|c| {
                    vec![
                        c.number.clone(),
                        c.issuance_bank.clone().unwrap_or_default(),
                        c.ledger
                            .latest()
                            .map(|r| r.amount.to_string())
                            .unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(
                &[
                    ("number", Align::Left),
                    ("bank", Align::Left),
                    ("latest balance", Align::Right),
                ],
                &rows,
            );
        }
        CardCmd::Owner { number } => {
            let Some(user_id) = db.user_id_for_card(&number)? else {
                return Err(anyhow!("No user associated with card number: {number}"));
            };
            println!("{user_id}");
        }
        CardCmd::Delete { number } => {
            if !db.delete_card(&number)? {
                return Err(anyhow!("Credit card not found for number: {number}"));
            }
            println!("Card deleted successfully");
        }
    }
    Ok(())
}

fn handle_balance(mut service: LedgerService<Db, Box<dyn Clock>>, cmd: BalanceCmd) -> Result<()> {
    match cmd {
        BalanceCmd::Update {
            number,
            date,
            amount,
        } => {
            let summary = service.apply_update(&BalanceUpdate::new(number.clone(), date, amount))?;
            println!("Balance updated successfully for card number: {number}.");
            if !summary.delta.is_zero() {
                println!(
                    "Adjusted {} later day(s) by {}.",
                    summary.propagated, summary.delta
                );
            }
        }
        BalanceCmd::Batch { file, json } => {
            let updates = read_batch(&file)?;
            let report = service.apply_batch(&updates);
            print_report(&report, json)?;
        }
        BalanceCmd::Show { number } => {
            let balance = service.current_balance(&number)?;
            println!("{number}\t{balance}");
        }
        BalanceCmd::History { number, limit } => {
            let history = service.history(&number)?;
            if history.is_empty() {
                println!("(no balances)");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = history
                .iter()
                .take(limit.unwrap_or(usize::MAX))
                .map(|r| vec![r.date.to_string(), r.amount.to_string()])
                .collect();
            print_table(&[("date", Align::Left), ("balance", Align::Right)], &rows);
        }
    }
    Ok(())
}

fn read_batch(file: &str) -> Result<Vec<BalanceUpdate>> {
    let raw = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read batch from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))?
    };
    serde_json::from_str(&raw).with_context(|| format!("Invalid batch payload in {file}"))
}

fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    print!("{report}");
    println!(
        "{} succeeded, {} failed.",
        report.succeeded(),
        report.failed()
    );
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Right,
}

fn print_table(columns: &[(&str, Align)], rows: &[Vec<String>]) {
    print!("{}", render_table(columns, rows));
}

/// Pipe table with one `|---|` rule under the header. Right-aligned columns
/// pad on the left so amounts line up on their last digit.
fn render_table(columns: &[(&str, Align)], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|(h, _)| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = columns.iter().map(|(h, _)| h.to_string()).collect();
    push_row(&mut out, columns, &widths, &header);
    out.push('|');
    for w in &widths {
        out.push_str(&"-".repeat(w + 2));
        out.push('|');
    }
    out.push('\n');
    for row in rows {
        push_row(&mut out, columns, &widths, row);
    }
    out
}

fn push_row(out: &mut String, columns: &[(&str, Align)], widths: &[usize], cells: &[String]) {
    out.push('|');
    for (i, ((_, align), &w)) in columns.iter().zip(widths).enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let padded = match align {
            Align::Left => format!(" {cell:<w$} |"),
            Align::Right => format!(" {cell:>w$} |"),
        };
        out.push_str(&padded);
    }
    out.push('\n');
}
