//! Financing CLI
//!
//! Prints amortization schedules, extra-payment simulations and portfolio
//! summaries for financings stored as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use financing_engine::{
    AmortizationTable, Financing, FinancingResult, SimulationResult, aggregate,
    generate_schedule, simulate_extra_payment, simulate_extra_payment_at,
};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "financing", version, about = "Fixed-installment financing calculations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the amortization table of a financing
    Schedule {
        /// JSON file with one financing
        file: PathBuf,
        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Simulate a one-time extra payment to principal
    Simulate {
        /// JSON file with one financing
        file: PathBuf,
        /// Extra payment amount
        #[arg(long)]
        extra: Decimal,
        /// Reference date for the new payoff date (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Aggregate totals over one or more files
    Summary {
        /// JSON files, each holding a financing or an array of financings
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FinancingFile {
    One(Financing),
    Many(Vec<Financing>),
}

/// Accepts either one financing object or an array of them.
fn parse_financings(raw: &str) -> serde_json::Result<Vec<Financing>> {
    Ok(match serde_json::from_str(raw)? {
        FinancingFile::One(financing) => vec![financing],
        FinancingFile::Many(financings) => financings,
    })
}

fn expect_single(mut financings: Vec<Financing>, path: &Path) -> Result<Financing> {
    if financings.len() != 1 {
        bail!(
            "{} holds {} financings, expected exactly one",
            path.display(),
            financings.len()
        );
    }
    Ok(financings.remove(0))
}

fn read_financings(path: &Path) -> Result<Vec<Financing>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_financings(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn read_single(path: &Path) -> Result<Financing> {
    expect_single(read_financings(path)?, path)
}

/// `--today` pins the reference date; without it the local clock is used.
fn run_simulation(
    financing: &Financing,
    extra: Decimal,
    today: Option<NaiveDate>,
) -> FinancingResult<SimulationResult> {
    match today {
        Some(today) => simulate_extra_payment_at(financing, extra, today),
        None => simulate_extra_payment(financing, extra),
    }
}

fn print_table(table: &AmortizationTable) {
    println!(
        "{:>4}  {:>10}  {:>12}  {:>12}  {:>12}  {:>14}  {}",
        "#", "Due", "Payment", "Principal", "Interest", "Balance", "Paid"
    );
    for row in table {
        println!(
            "{:>4}  {:>10}  {:>12.2}  {:>12.2}  {:>12.2}  {:>14.2}  {}",
            row.installment_number,
            row.due_date,
            row.payment,
            row.principal_portion,
            row.interest_portion,
            row.balance_after,
            if row.is_paid { "yes" } else { "" }
        );
    }
    println!();
    println!("Total interest: {:.2}", table.total_interest);
    println!("Total paid:     {:.2}", table.total_paid);
    println!("Cost ratio:     {:.4}", table.cost_ratio);
    if !table.is_amortizing() {
        println!(
            "Warning: installment does not cover the interest, {:.2} still owed after the last row",
            table.final_balance
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Schedule { file, json } => {
            let financing = read_single(&file)?;
            let table = generate_schedule(&financing)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print_table(&table);
            }
        }
        Command::Simulate { file, extra, today } => {
            let financing = read_single(&file)?;
            let result = run_simulation(&financing, extra, today)?;
            println!("Remaining installments: {}", result.remaining_installments);
            println!("Projected installments: {}", result.current_installments);
            println!("New installments:       {}", result.new_installments);
            println!("Months reduced:         {}", result.months_reduced);
            println!("Interest saved:         {:.2}", result.interest_saved);
            println!(
                "New remaining amount:   {:.2}",
                result.new_remaining_amount.max(Decimal::ZERO)
            );
            println!("New payoff date:        {}", result.new_payoff_date);
        }
        Command::Summary { files } => {
            let mut financings = Vec::new();
            for file in &files {
                financings.extend(read_financings(file)?);
            }
            let summary = aggregate(&financings)?;
            println!("Financings:             {}", summary.count);
            println!("Total debt:             {:.2}", summary.total_debt);
            println!("Total monthly payment:  {:.2}", summary.total_monthly_payment);
            println!("Average rate (% / mo):  {:.4}", summary.average_rate);
            println!("Weighted rate (% / mo): {:.4}", summary.balance_weighted_rate);
            println!(
                "Weighted months left:   {:.1}",
                summary.weighted_avg_remaining_months
            );
        }
    }

    Ok(())
}
