//! French (constant-installment) amortization schedule.
//!
//! The table is always rebuilt from the original principal, so paid and
//! unpaid rows come out of the same recurrence. Historical deviations such as
//! a skipped or extra past payment are therefore not visible here.

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::error::{FinancingError, FinancingResult};
use crate::financing::{Financing, add_months};

/// One installment of the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    /// 1-based installment number.
    pub installment_number: u32,
    /// `start_date` plus `installment_number` calendar months.
    pub due_date: NaiveDate,
    /// Amount paid in this installment, always `principal_portion + interest_portion`.
    pub payment: Money,
    /// Part of the payment that reduces the balance.
    pub principal_portion: Money,
    /// Part of the payment charged as interest on the opening balance.
    pub interest_portion: Money,
    /// Outstanding balance once this installment is paid.
    pub balance_after: Money,
    /// `installment_number <= paid_installments`.
    pub is_paid: bool,
}

/// The full schedule plus the totals derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationTable {
    rows: Vec<AmortizationRow>,
    /// Sum of every row's interest portion, rounded to cents.
    pub total_interest: Money,
    /// Contractual total: `monthly_payment * total_installments`, rounded to cents.
    pub total_paid: Money,
    /// `total_interest / total_amount`.
    pub cost_ratio: Decimal,
    /// Interest carried by the rows already paid, rounded to cents.
    pub paid_interest: Money,
    /// Balance left after the last row. Zero for a loan that amortizes.
    pub final_balance: Money,
    /// First installment whose balance reached zero.
    pub payoff_installment: Option<u32>,
}

impl AmortizationTable {
    /// Rows ordered by installment number.
    pub fn rows(&self) -> &[AmortizationRow] {
        &self.rows
    }

    /// Number of rows, always the financing's `total_installments`.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for a 1-based installment number.
    pub fn get(&self, installment_number: u32) -> Option<&AmortizationRow> {
        let index = installment_number.checked_sub(1)?;
        self.rows.get(index as usize)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AmortizationRow> {
        self.rows.iter()
    }

    /// False when the installment never outgrows the interest and the
    /// balance is still open after the last row.
    pub fn is_amortizing(&self) -> bool {
        self.final_balance.is_zero()
    }
}

impl<'a> IntoIterator for &'a AmortizationTable {
    type Item = &'a AmortizationRow;
    type IntoIter = std::slice::Iter<'a, AmortizationRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Builds the row-by-row schedule of a financing.
///
/// Each row charges `balance * r` of interest and applies the rest of the
/// installment to principal. Two cases bend the plain recurrence:
///
/// * when the balance is smaller than the principal share, the principal is
///   capped at the balance and the row's payment shrinks accordingly; rows
///   after payoff are all zeros;
/// * when the installment does not cover the interest, the principal share
///   is zero, the interest portion is capped at the installment and the
///   balance stays flat. Such a table is complete but
///   [`AmortizationTable::is_amortizing`] returns false.
///
/// # Errors
///
/// Returns [`crate::FinancingError::InvalidInput`] when the financing breaks
/// one of its invariants (see [`Financing::validate`]), and
/// [`crate::FinancingError::Overflow`] when interest or totals leave the
/// `Decimal` range.
pub fn generate_schedule(financing: &Financing) -> FinancingResult<AmortizationTable> {
    financing.validate()?;

    let rate = financing.monthly_rate_fraction();
    let monthly_payment = financing.monthly_payment;

    let mut balance = financing.total_amount;
    let mut total_interest = Decimal::ZERO;
    let mut paid_interest = Decimal::ZERO;
    let mut payoff_installment = None;
    let mut rows = Vec::with_capacity(financing.total_installments as usize);

    for installment_number in 1..=financing.total_installments {
        let due_date = add_months(financing.start_date, installment_number)?;
        let is_paid = installment_number <= financing.paid_installments;

        let interest = balance
            .checked_mul(rate)
            .ok_or_else(|| FinancingError::overflow("schedule interest"))?;
        let interest_portion = interest.min(monthly_payment).max(Decimal::ZERO);
        let principal_portion = (monthly_payment - interest)
            .max(Decimal::ZERO)
            .min(balance);

        balance = (balance - principal_portion).max(Decimal::ZERO);
        if balance.is_zero() && payoff_installment.is_none() {
            payoff_installment = Some(installment_number);
        }

        total_interest = total_interest
            .checked_add(interest_portion)
            .ok_or_else(|| FinancingError::overflow("schedule total interest"))?;
        if is_paid {
            paid_interest += interest_portion;
        }

        rows.push(AmortizationRow {
            installment_number,
            due_date,
            payment: principal_portion + interest_portion,
            principal_portion,
            interest_portion,
            balance_after: balance,
            is_paid,
        });
    }

    if !balance.is_zero() {
        warn!(
            "financing does not amortize: balance {} left after {} installments of {}",
            balance.round_dp(2),
            financing.total_installments,
            monthly_payment
        );
    }
    debug!(
        "generated {} rows, total interest {}, payoff at {:?}",
        rows.len(),
        total_interest.round_dp(2),
        payoff_installment
    );

    let total_paid = monthly_payment
        .checked_mul(Decimal::from(financing.total_installments))
        .ok_or_else(|| FinancingError::overflow("schedule total paid"))?;
    let cost_ratio = total_interest
        .checked_div(financing.total_amount)
        .ok_or_else(|| FinancingError::overflow("schedule cost ratio"))?;

    Ok(AmortizationTable {
        rows,
        total_interest: total_interest.round_dp(2),
        total_paid: total_paid.round_dp(2),
        cost_ratio,
        paid_interest: paid_interest.round_dp(2),
        final_balance: balance,
        payoff_installment,
    })
}
