//! Extra (lump-sum) payment simulation.
//!
//! An extra payment goes straight to principal and keeps the installment
//! amount, so its effect is a shorter term. The term is found with the
//! closed-form period count of a constant-payment loan:
//!
//! ```text
//! n = ceil( -ln(1 - B·r / PMT) / ln(1 + r) )
//! ```

use chrono::{Local, NaiveDate};
use log::{debug, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::error::{FinancingError, FinancingResult};
use crate::financing::{Financing, add_months};

/// Outcome of [`installments_to_payoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoffTerm {
    /// The balance is cleared after this many installments (0 when nothing is owed).
    Installments(u32),
    /// The installment never exceeds the interest on the balance.
    NonAmortizing,
}

/// Effect of a one-time extra payment on the remaining schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Installments no longer needed. Never negative.
    pub months_reduced: u32,
    /// Interest no longer paid. Never negative.
    pub interest_saved: Money,
    /// Reference date plus `new_installments` calendar months.
    pub new_payoff_date: NaiveDate,
    /// `remaining_amount - extra_amount`, unclamped. Negative when the
    /// extra payment exceeds the balance.
    pub new_remaining_amount: Money,
    /// Installments left after the extra payment; 0 when the balance is settled.
    pub new_installments: u32,
    /// Contractual installments left before the extra payment.
    /// `months_reduced` is measured against this count.
    pub remaining_installments: u32,
    /// Projected installments that clear the current balance without the
    /// extra payment. `interest_saved` is measured against this count, so it
    /// differs from `remaining_installments` when the balance and the
    /// contractual term disagree.
    pub current_installments: u32,
}

/// Number of fixed installments that clear `balance` at `monthly_rate`
/// (a fraction, not a percentage).
///
/// A zero rate uses the linear count `ceil(balance / payment)`. The ceiling
/// of the logarithmic count is checked against the exact balance recurrence
/// so that rounding in `ln` cannot move it across an integer boundary.
///
/// # Errors
///
/// Returns an error when `payment` is not positive, the rate is negative, an
/// intermediate leaves the `Decimal` range or the count does not fit in a
/// `u32`.
pub fn installments_to_payoff(
    balance: Money,
    monthly_rate: Decimal,
    payment: Money,
) -> FinancingResult<PayoffTerm> {
    if payment <= Decimal::ZERO {
        return Err(FinancingError::invalid("monthly_payment", "must be greater than zero"));
    }
    if monthly_rate < Decimal::ZERO {
        return Err(FinancingError::invalid("interest_rate", "cannot be negative"));
    }
    if balance <= Decimal::ZERO {
        return Ok(PayoffTerm::Installments(0));
    }

    if monthly_rate.is_zero() {
        let periods = balance
            .checked_div(payment)
            .ok_or_else(|| FinancingError::overflow("linear installment count"))?;
        return to_count(periods.ceil()).map(PayoffTerm::Installments);
    }

    let pmt_factor = balance
        .checked_mul(monthly_rate)
        .and_then(|interest| interest.checked_div(payment))
        .ok_or_else(|| FinancingError::overflow("payment factor"))?;
    if pmt_factor >= Decimal::ONE {
        return Ok(PayoffTerm::NonAmortizing);
    }

    let raw = (-(Decimal::ONE - pmt_factor).ln())
        .checked_div((Decimal::ONE + monthly_rate).ln())
        .ok_or_else(|| FinancingError::overflow("logarithmic installment count"))?;
    let mut count = to_count(raw.ceil())?;

    if count > 0
        && residual_balance(balance, monthly_rate, payment, count - 1)
            .is_some_and(|residual| residual <= Decimal::ZERO)
    {
        count -= 1;
    } else if residual_balance(balance, monthly_rate, payment, count)
        .is_some_and(|residual| residual > Decimal::ZERO)
    {
        count += 1;
    }

    Ok(PayoffTerm::Installments(count))
}

/// Balance left after `periods` installments: `B·g^k - PMT·(g^k - 1)/r`.
/// `None` when an intermediate leaves the decimal range.
fn residual_balance(balance: Money, rate: Decimal, payment: Money, periods: u32) -> Option<Money> {
    let growth = (Decimal::ONE + rate).checked_powu(u64::from(periods))?;
    let grown_balance = balance.checked_mul(growth)?;
    let paid = payment.checked_mul(growth - Decimal::ONE)?.checked_div(rate)?;
    grown_balance.checked_sub(paid)
}

/// Interest carried by `installments` full payments that clear `balance`.
fn interest_over(payment: Money, installments: u32, balance: Money) -> FinancingResult<Money> {
    payment
        .checked_mul(Decimal::from(installments))
        .and_then(|total| total.checked_sub(balance))
        .ok_or_else(|| FinancingError::overflow("projected interest"))
}

fn to_count(value: Decimal) -> FinancingResult<u32> {
    value.to_u32().ok_or_else(|| FinancingError::Overflow {
        context: format!("installment count {value}"),
    })
}

/// Simulates an extra payment using today's local date as the reference.
pub fn simulate_extra_payment(
    financing: &Financing,
    extra_amount: Money,
) -> FinancingResult<SimulationResult> {
    simulate_extra_payment_at(financing, extra_amount, Local::now().date_naive())
}

/// Simulates an extra payment of `extra_amount` made on `today`.
///
/// The interest still owed without the extra payment is projected with the
/// same period count as the reduced balance, falling back to the contractual
/// remaining installments when the current balance cannot amortize. When the
/// reduced balance cannot amortize either, no improvement is reported.
///
/// # Errors
///
/// Returns [`FinancingError::InvalidInput`] when `extra_amount` is not
/// positive or the financing breaks one of its invariants, and
/// [`FinancingError::Overflow`] when the amounts leave the `Decimal` range.
pub fn simulate_extra_payment_at(
    financing: &Financing,
    extra_amount: Money,
    today: NaiveDate,
) -> FinancingResult<SimulationResult> {
    financing.validate()?;
    if extra_amount <= Decimal::ZERO {
        return Err(FinancingError::invalid("extra_amount", "must be greater than zero"));
    }

    let rate = financing.monthly_rate_fraction();
    let monthly_payment = financing.monthly_payment;
    let remaining_installments = financing.remaining_installments();

    let current_installments =
        match installments_to_payoff(financing.remaining_amount, rate, monthly_payment)? {
            PayoffTerm::Installments(count) => count,
            PayoffTerm::NonAmortizing => remaining_installments,
        };
    let current_total_interest =
        interest_over(monthly_payment, current_installments, financing.remaining_amount)?;

    let new_remaining_amount = financing.remaining_amount - extra_amount;
    let new_installments = match installments_to_payoff(new_remaining_amount, rate, monthly_payment)? {
        PayoffTerm::Installments(count) => count,
        PayoffTerm::NonAmortizing => {
            warn!(
                "balance {} does not amortize with installments of {}; keeping {} installments",
                new_remaining_amount, monthly_payment, remaining_installments
            );
            remaining_installments
        }
    };

    let months_reduced = remaining_installments.saturating_sub(new_installments);
    let new_total_interest = interest_over(
        monthly_payment,
        new_installments,
        new_remaining_amount.max(Decimal::ZERO),
    )?;
    let interest_saved = current_total_interest
        .checked_sub(new_total_interest)
        .ok_or_else(|| FinancingError::overflow("interest saved"))?
        .max(Decimal::ZERO);
    let new_payoff_date = add_months(today, new_installments)?;

    debug!(
        "extra payment {}: {} -> {} installments, interest saved {}",
        extra_amount, remaining_installments, new_installments, interest_saved
    );

    Ok(SimulationResult {
        months_reduced,
        interest_saved,
        new_payoff_date,
        new_remaining_amount,
        new_installments,
        remaining_installments,
        current_installments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financing::tests::sample_financing;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 15).unwrap()
    }

    #[test]
    fn test_sample_extra_payment() {
        let result = simulate_extra_payment_at(&sample_financing(), dec!(5000), today()).unwrap();

        assert_eq!(result.new_remaining_amount, dec!(73000));
        assert_eq!(result.remaining_installments, 33);
        assert_eq!(result.new_installments, 32);
        assert_eq!(result.current_installments, 34);
        assert_eq!(result.months_reduced, 1);
        // 34 * 2850 - 78000 before, 32 * 2850 - 73000 after
        assert_eq!(result.interest_saved, dec!(700));
        assert_eq!(result.new_payoff_date, NaiveDate::from_ymd_opt(2028, 1, 15).unwrap());
    }

    #[test]
    fn test_extra_payment_above_balance_settles_loan() {
        let result = simulate_extra_payment_at(&sample_financing(), dec!(80000), today()).unwrap();

        assert_eq!(result.new_remaining_amount, dec!(-2000));
        assert_eq!(result.new_installments, 0);
        assert_eq!(result.months_reduced, 33);
        assert_eq!(result.interest_saved, dec!(18900));
        assert_eq!(result.new_payoff_date, today());
    }

    #[test]
    fn test_zero_rate_uses_linear_count() {
        let financing = Financing {
            total_amount: dec!(12000),
            remaining_amount: dec!(6000),
            monthly_payment: dec!(1000),
            interest_rate: dec!(0),
            total_installments: 12,
            paid_installments: 6,
            ..sample_financing()
        };
        let result = simulate_extra_payment_at(&financing, dec!(2500), today()).unwrap();

        assert_eq!(result.new_installments, 4);
        assert_eq!(result.months_reduced, 2);
        // 6 * 1000 - 6000 before, 4 * 1000 - 3500 after
        assert_eq!(result.interest_saved, dec!(0));
    }

    #[test]
    fn test_non_amortizing_balance_reports_no_improvement() {
        let financing = Financing {
            total_amount: dec!(100000),
            remaining_amount: dec!(100000),
            monthly_payment: dec!(500),
            interest_rate: dec!(1),
            total_installments: 24,
            paid_installments: 4,
            ..sample_financing()
        };
        let result = simulate_extra_payment_at(&financing, dec!(1000), today()).unwrap();

        assert_eq!(result.new_installments, 20);
        assert_eq!(result.months_reduced, 0);
        assert_eq!(result.interest_saved, dec!(0));
    }

    #[test]
    fn test_rejects_non_positive_extra_amount() {
        for extra in [dec!(0), dec!(-10)] {
            let err = simulate_extra_payment_at(&sample_financing(), extra, today()).unwrap_err();
            assert!(matches!(err, FinancingError::InvalidInput { ref field, .. } if field == "extra_amount"));
        }
    }

    #[test]
    fn test_amounts_beyond_decimal_range_report_overflow() {
        let financing = Financing {
            total_amount: Decimal::MAX,
            remaining_amount: Decimal::MAX,
            monthly_payment: dec!(1),
            interest_rate: dec!(200),
            total_installments: 2,
            paid_installments: 0,
            ..sample_financing()
        };
        let err = simulate_extra_payment_at(&financing, dec!(1), today()).unwrap_err();
        assert!(matches!(err, FinancingError::Overflow { .. }));

        let err = installments_to_payoff(Decimal::MAX, dec!(0), dec!(0.0000001)).unwrap_err();
        assert!(matches!(err, FinancingError::Overflow { .. }));
    }

    #[test]
    fn test_installments_to_payoff_boundaries() {
        assert_eq!(
            installments_to_payoff(dec!(0), dec!(0.01), dec!(100)).unwrap(),
            PayoffTerm::Installments(0)
        );
        assert_eq!(
            installments_to_payoff(dec!(1000), dec!(0.1), dec!(100)).unwrap(),
            PayoffTerm::NonAmortizing
        );
        assert_eq!(
            installments_to_payoff(dec!(1000), dec!(0), dec!(100)).unwrap(),
            PayoffTerm::Installments(10)
        );
        assert!(installments_to_payoff(dec!(1000), dec!(0.01), dec!(0)).is_err());
    }

    #[test]
    fn test_exact_annuity_is_not_pushed_to_an_extra_period() {
        // 1000 at 10% over 2 periods with the exact annuity payment
        let payment = dec!(1000) * dec!(1.21) * dec!(0.1) / dec!(0.21);
        assert_eq!(
            installments_to_payoff(dec!(1000), dec!(0.1), payment.round_dp(20) + dec!(0.00000001)).unwrap(),
            PayoffTerm::Installments(2)
        );
    }
}
