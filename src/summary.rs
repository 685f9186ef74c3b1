use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FinancingError, FinancingResult};
use crate::financing::Financing;
use crate::{Money, Rate};

/// Portfolio-level totals over a set of financings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    /// Number of financings aggregated.
    pub count: usize,
    /// Sum of outstanding balances.
    pub total_debt: Money,
    /// Sum of installments due each month.
    pub total_monthly_payment: Money,
    /// Plain mean of the monthly rates. Not weighted by balance.
    pub average_rate: Rate,
    /// Monthly rate weighted by outstanding balance. 0 when there is no debt.
    pub balance_weighted_rate: Rate,
    /// Remaining installments weighted by outstanding balance. 0 when there is no debt.
    pub weighted_avg_remaining_months: Decimal,
}

/// Aggregates a collection of financings. An empty slice yields all zeros.
///
/// # Errors
///
/// Returns [`crate::FinancingError::InvalidInput`] for the first financing
/// that breaks one of its invariants, and [`FinancingError::Overflow`] when a
/// total leaves the `Decimal` range.
pub fn aggregate(financings: &[Financing]) -> FinancingResult<PortfolioSummary> {
    let mut total_debt = Decimal::ZERO;
    let mut total_monthly_payment = Decimal::ZERO;
    let mut rate_sum = Decimal::ZERO;
    let mut rate_weight = Decimal::ZERO;
    let mut months_weight = Decimal::ZERO;

    for financing in financings {
        financing.validate()?;

        total_debt = checked_sum(total_debt, financing.remaining_amount, "total debt")?;
        total_monthly_payment = checked_sum(
            total_monthly_payment,
            financing.monthly_payment,
            "total monthly payment",
        )?;
        rate_sum = checked_sum(rate_sum, financing.interest_rate, "rate sum")?;

        let rate_term = financing
            .interest_rate
            .checked_mul(financing.remaining_amount)
            .ok_or_else(|| FinancingError::overflow("balance-weighted rate"))?;
        rate_weight = checked_sum(rate_weight, rate_term, "balance-weighted rate")?;

        let months_term = Decimal::from(financing.remaining_installments())
            .checked_mul(financing.remaining_amount)
            .ok_or_else(|| FinancingError::overflow("weighted remaining months"))?;
        months_weight = checked_sum(months_weight, months_term, "weighted remaining months")?;
    }

    if financings.is_empty() {
        return Ok(PortfolioSummary::default());
    }

    let (balance_weighted_rate, weighted_avg_remaining_months) = if total_debt.is_zero() {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        (
            rate_weight
                .checked_div(total_debt)
                .ok_or_else(|| FinancingError::overflow("balance-weighted rate"))?,
            months_weight
                .checked_div(total_debt)
                .ok_or_else(|| FinancingError::overflow("weighted remaining months"))?,
        )
    };

    debug!(
        "aggregated {} financings, total debt {}",
        financings.len(),
        total_debt
    );

    Ok(PortfolioSummary {
        count: financings.len(),
        total_debt,
        total_monthly_payment,
        average_rate: rate_sum / Decimal::from(financings.len()),
        balance_weighted_rate,
        weighted_avg_remaining_months,
    })
}

fn checked_sum(total: Decimal, term: Decimal, context: &str) -> FinancingResult<Decimal> {
    total
        .checked_add(term)
        .ok_or_else(|| FinancingError::overflow(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financing::tests::sample_financing;
    use rust_decimal_macros::dec;

    fn car_loan() -> Financing {
        Financing {
            total_amount: dec!(40000),
            remaining_amount: dec!(22000),
            monthly_payment: dec!(1150),
            interest_rate: dec!(0.99),
            total_installments: 36,
            paid_installments: 16,
            ..sample_financing()
        }
    }

    #[test]
    fn test_aggregate_two_financings() {
        let summary = aggregate(&[sample_financing(), car_loan()]).unwrap();

        assert_eq!(summary.count, 2);
        assert_eq!(summary.total_debt, dec!(100000));
        assert_eq!(summary.total_monthly_payment, dec!(4000));
        assert_eq!(summary.average_rate, dec!(1.14));
        // (33 * 78000 + 20 * 22000) / 100000
        assert_eq!(summary.weighted_avg_remaining_months, dec!(30.14));
        // (1.29 * 78000 + 0.99 * 22000) / 100000
        assert_eq!(summary.balance_weighted_rate, dec!(1.224));
    }

    #[test]
    fn test_average_rate_ignores_balances() {
        // A tiny loan at a high rate pulls the plain mean as much as a large one.
        let tiny = Financing {
            total_amount: dec!(1000),
            remaining_amount: dec!(100),
            monthly_payment: dec!(100),
            interest_rate: dec!(5),
            total_installments: 12,
            paid_installments: 11,
            ..sample_financing()
        };
        let summary = aggregate(&[sample_financing(), tiny]).unwrap();
        assert_eq!(summary.average_rate, dec!(3.145));
        assert!(summary.balance_weighted_rate < dec!(1.3));
    }

    #[test]
    fn test_zero_debt_returns_zero_weighted_values() {
        let settled = Financing {
            remaining_amount: dec!(0),
            paid_installments: 48,
            ..sample_financing()
        };
        let summary = aggregate(&[settled]).unwrap();

        assert_eq!(summary.total_debt, dec!(0));
        assert_eq!(summary.weighted_avg_remaining_months, dec!(0));
        assert_eq!(summary.balance_weighted_rate, dec!(0));
        assert_eq!(summary.average_rate, dec!(1.29));
    }

    #[test]
    fn test_empty_portfolio() {
        assert_eq!(aggregate(&[]).unwrap(), PortfolioSummary::default());
    }

    #[test]
    fn test_debt_beyond_decimal_range_reports_overflow() {
        let huge = Financing {
            total_amount: Decimal::MAX,
            remaining_amount: Decimal::MAX,
            monthly_payment: dec!(1),
            interest_rate: dec!(0),
            total_installments: 2,
            paid_installments: 2,
            ..sample_financing()
        };
        let err = aggregate(&[huge.clone(), huge.clone()]).unwrap_err();
        assert!(matches!(err, FinancingError::Overflow { ref context } if context == "total debt"));

        let expensive = Financing {
            interest_rate: dec!(200),
            paid_installments: 0,
            ..huge
        };
        let err = aggregate(&[expensive.clone(), expensive]).unwrap_err();
        assert!(matches!(err, FinancingError::Overflow { .. }));
    }

    #[test]
    fn test_invalid_member_is_rejected() {
        let broken = Financing {
            monthly_payment: dec!(0),
            ..car_loan()
        };
        assert!(aggregate(&[sample_financing(), broken]).is_err());
    }
}
