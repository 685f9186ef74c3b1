use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{FinancingError, FinancingResult};
use crate::{Money, Rate};

/// A fixed-installment loan as supplied by the data layer.
///
/// The engine only ever reads it. `interest_rate` is a **monthly** percentage
/// (`1.29` means 1.29% per month); annual rates must go through
/// [`crate::normalize_annual_interest_rate`] first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financing {
    /// Original principal borrowed.
    pub total_amount: Money,
    /// Current outstanding balance.
    pub remaining_amount: Money,
    /// Fixed installment amount.
    pub monthly_payment: Money,
    /// Monthly nominal rate as a percentage.
    pub interest_rate: Rate,
    /// Contractual number of installments.
    pub total_installments: u32,
    /// Installments already paid.
    pub paid_installments: u32,
    /// Origination date.
    pub start_date: NaiveDate,
}

impl Financing {
    /// Checks the invariants every engine entry point relies on.
    pub fn validate(&self) -> FinancingResult<()> {
        if self.total_amount <= Decimal::ZERO {
            return Err(FinancingError::invalid("total_amount", "must be greater than zero"));
        }
        if self.monthly_payment <= Decimal::ZERO {
            return Err(FinancingError::invalid("monthly_payment", "must be greater than zero"));
        }
        if self.interest_rate < Decimal::ZERO {
            return Err(FinancingError::invalid("interest_rate", "cannot be negative"));
        }
        if self.total_installments == 0 {
            return Err(FinancingError::invalid("total_installments", "must be greater than zero"));
        }
        if self.paid_installments > self.total_installments {
            return Err(FinancingError::invalid(
                "paid_installments",
                "cannot exceed total_installments",
            ));
        }
        if self.remaining_amount < Decimal::ZERO {
            return Err(FinancingError::invalid("remaining_amount", "cannot be negative"));
        }
        if self.remaining_amount > self.total_amount {
            return Err(FinancingError::invalid(
                "remaining_amount",
                "cannot exceed total_amount",
            ));
        }
        Ok(())
    }

    /// Contractual installments not yet paid.
    pub fn remaining_installments(&self) -> u32 {
        self.total_installments.saturating_sub(self.paid_installments)
    }

    /// Monthly rate as a fraction (`1.29` becomes `0.0129`).
    pub fn monthly_rate_fraction(&self) -> Decimal {
        self.interest_rate / dec!(100)
    }

    /// Share of installments already paid, between 0 and 1. A record with
    /// no installments, which `validate` rejects, reports 0.
    pub fn progress(&self) -> Decimal {
        if self.total_installments == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.paid_installments) / Decimal::from(self.total_installments)
    }
}

/// Calendar-month addition; the day is clamped to the end of shorter months.
pub(crate) fn add_months(date: NaiveDate, months: u32) -> FinancingResult<NaiveDate> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        FinancingError::DateOutOfRange(format!("{date} + {months} months"))
    })
}
