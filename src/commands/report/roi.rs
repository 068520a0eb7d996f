use rust_decimal::Decimal;

use crate::model::{MonthlyRoi, SalesMarketingRow};

pub fn monthly_roi(report: &[SalesMarketingRow]) -> Vec<MonthlyRoi> {
    report
        .iter()
        .map(|row| MonthlyRoi {
            month: row.month,
            total_sales: row.total_sales,
            marketing_spend: row.marketing_spend,
            roi: safe_ratio(row.total_sales, row.marketing_spend),
        })
        .collect()
}

/// `None` unless the denominator is present and strictly positive.
pub fn safe_ratio(numerator: Decimal, denominator: Option<Decimal>) -> Option<Decimal> {
    let denominator = denominator.filter(|value| *value > Decimal::ZERO)?;
    numerator.checked_div(denominator)
}
