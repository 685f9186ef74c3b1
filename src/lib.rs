//! `financing_engine` computes what a fixed-installment financing looks like
//! over time.
//!
//! It covers the three calculations behind a personal-finance loan screen:
//! - **Schedule**: the row-by-row French (Price) amortization table of a
//!   financing, rebuilt from its original principal.
//! - **Extra payment**: how many installments and how much interest a
//!   one-time payment to principal saves, and the new payoff date.
//! - **Portfolio summary**: total debt, monthly commitment and average rates
//!   over several financings.
//!
//! Rates given to the engine are **monthly percentages** (`1.29` is 1.29% a
//! month). Use [`normalize_annual_interest_rate`] to convert annual rates.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use financing_engine::{Financing, generate_schedule, simulate_extra_payment_at};
//! use rust_decimal_macros::dec;
//!
//! let financing = Financing {
//!     total_amount: dec!(120_000),
//!     remaining_amount: dec!(78_000),
//!     monthly_payment: dec!(2_850),
//!     interest_rate: dec!(1.29),
//!     total_installments: 48,
//!     paid_installments: 15,
//!     start_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//! };
//!
//! let table = generate_schedule(&financing).unwrap();
//! let first = table.get(1).unwrap();
//! assert_eq!(first.interest_portion, dec!(1548));
//! assert_eq!(first.balance_after, dec!(118_698));
//!
//! let today = NaiveDate::from_ymd_opt(2025, 5, 15).unwrap();
//! let simulation = simulate_extra_payment_at(&financing, dec!(5_000), today).unwrap();
//! assert!(simulation.months_reduced > 0);
//! println!("Payoff moves to {}", simulation.new_payoff_date);
//! ```

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

pub mod error;
pub mod financing;
pub mod schedule;
pub mod simulation;
pub mod summary;

pub use error::{FinancingError, FinancingResult};
pub use financing::Financing;
pub use schedule::{AmortizationRow, AmortizationTable, generate_schedule};
pub use simulation::{
    PayoffTerm, SimulationResult, installments_to_payoff, simulate_extra_payment,
    simulate_extra_payment_at,
};
pub use summary::{PortfolioSummary, aggregate};

/// Monetary amounts.
pub type Money = Decimal;

/// Monthly rates as percentages (`1.29` = 1.29% a month).
pub type Rate = Decimal;

/// Converts an annual interest rate percentage into the equivalent monthly
/// percentage under monthly compounding.
///
/// `12` (12% a year) becomes roughly `0.9489` (% a month), since
/// `(1 + 0.12)^(1/12) - 1 ≈ 0.009489`.
pub fn normalize_annual_interest_rate(annual_percent: Rate) -> Rate {
    let base = Decimal::ONE + annual_percent / dec!(100);
    let exponent = Decimal::ONE / dec!(12);

    (base.powd(exponent) - Decimal::ONE) * dec!(100)
}
