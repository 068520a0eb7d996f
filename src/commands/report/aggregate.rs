use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::model::{
    MarketingRecord, MonthlyCategorySales, MonthlySales, MonthlySpend, OrderRecord,
    SalesMarketingRow,
};
use crate::util::month_start;

#[derive(Default)]
struct SalesAccumulator {
    order_count: u64,
    total_sales: Decimal,
}

impl SalesAccumulator {
    fn add(&mut self, month: NaiveDate, order: &OrderRecord) -> Result<()> {
        self.order_count += 1;
        if let Some(amount) = order.order_amount {
            self.total_sales = self.total_sales.checked_add(amount).with_context(|| {
                format!("sales total for {} exceeds the decimal range", month.format("%Y-%m"))
            })?;
        }
        Ok(())
    }
}

/// Sparse by construction: months without orders do not appear.
pub fn monthly_sales(orders: &[OrderRecord]) -> Result<Vec<MonthlySales>> {
    let mut by_month: BTreeMap<NaiveDate, SalesAccumulator> = BTreeMap::new();

    for order in orders {
        let Some(order_date) = order.order_date else {
            continue;
        };
        let month = month_start(order_date);
        by_month.entry(month).or_default().add(month, order)?;
    }

    Ok(by_month
        .into_iter()
        .map(|(month, acc)| MonthlySales {
            month,
            order_count: acc.order_count,
            total_sales: acc.total_sales,
        })
        .collect())
}

pub fn monthly_category_sales(orders: &[OrderRecord]) -> Result<Vec<MonthlyCategorySales>> {
    let mut by_key: BTreeMap<(NaiveDate, &str), SalesAccumulator> = BTreeMap::new();

    for order in orders {
        let Some(order_date) = order.order_date else {
            continue;
        };
        let month = month_start(order_date);
        by_key
            .entry((month, order.product_category.as_str()))
            .or_default()
            .add(month, order)?;
    }

    Ok(by_key
        .into_iter()
        .map(|((month, category), acc)| MonthlyCategorySales {
            month,
            product_category: category.to_string(),
            order_count: acc.order_count,
            total_sales: acc.total_sales,
        })
        .collect())
}

/// Sums valued spend per month. A month whose records all lack an amount
/// keeps `marketing_spend: None` with a non-zero `record_count`.
pub fn monthly_spend(records: &[MarketingRecord]) -> Result<Vec<MonthlySpend>> {
    let mut by_month: BTreeMap<NaiveDate, (Option<Decimal>, usize)> = BTreeMap::new();

    for record in records {
        let Some(month) = record.month else {
            continue;
        };
        let entry = by_month.entry(month).or_insert((None, 0));
        entry.1 += 1;
        if let Some(amount) = record.spend_amount {
            let total = entry.0.unwrap_or(Decimal::ZERO).checked_add(amount);
            entry.0 = Some(total.with_context(|| {
                format!("marketing spend for {} exceeds the decimal range", month.format("%Y-%m"))
            })?);
        }
    }

    Ok(by_month
        .into_iter()
        .map(|(month, (marketing_spend, record_count))| MonthlySpend {
            month,
            marketing_spend,
            record_count,
        })
        .collect())
}

/// Left join keyed by month; the sales calendar is the reporting spine.
pub fn join_sales_and_spend(
    sales: &[MonthlySales],
    spend: &[MonthlySpend],
) -> Vec<SalesMarketingRow> {
    let spend_by_month: BTreeMap<NaiveDate, Option<Decimal>> = spend
        .iter()
        .map(|row| (row.month, row.marketing_spend))
        .collect();

    sales
        .iter()
        .map(|row| SalesMarketingRow {
            month: row.month,
            order_count: row.order_count,
            total_sales: row.total_sales,
            marketing_spend: spend_by_month.get(&row.month).copied().flatten(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::model::{Channel, ExpectedChannel};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn order(id: u32, customer: &str, day: &str, amount: Option<Decimal>) -> OrderRecord {
        OrderRecord {
            order_id: id.to_string(),
            customer_id: customer.to_string(),
            order_date: crate::util::parse_calendar_date(day),
            order_amount: amount,
            product_category: if id % 2 == 0 { "Toys" } else { "Books" }.to_string(),
        }
    }

    fn spend(month: NaiveDate, amount: Option<Decimal>) -> MarketingRecord {
        MarketingRecord {
            month: Some(month),
            channel: Channel::Expected(ExpectedChannel::Facebook),
            spend_amount: amount,
            negative_spend_flag: false,
        }
    }

    fn example_orders() -> Vec<OrderRecord> {
        vec![
            order(1, "C1", "2024-01-05", Some(dec!(100))),
            order(2, "C1", "2024-01-20", Some(dec!(50))),
            order(3, "C2", "2024-02-01", Some(dec!(200))),
        ]
    }

    #[test]
    fn monthly_sales_matches_documented_example() {
        let sales = monthly_sales(&example_orders()).expect("sales");
        assert_eq!(
            sales,
            vec![
                MonthlySales {
                    month: date(2024, 1, 1),
                    order_count: 2,
                    total_sales: dec!(150),
                },
                MonthlySales {
                    month: date(2024, 2, 1),
                    order_count: 1,
                    total_sales: dec!(200),
                },
            ]
        );
    }

    #[test]
    fn monthly_sales_counts_unvalued_orders_but_skips_undated_ones() {
        let orders = vec![
            order(1, "C1", "2024-03-02", None),
            order(2, "C1", "2024-03-09", Some(dec!(10))),
            order(3, "C2", "garbage", Some(dec!(999))),
        ];
        let sales = monthly_sales(&orders).expect("sales");
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].order_count, 2);
        assert_eq!(sales[0].total_sales, dec!(10));
    }

    #[test]
    fn monthly_sales_is_sparse() {
        let orders = vec![
            order(1, "C1", "2024-01-05", Some(dec!(1))),
            order(2, "C1", "2024-04-05", Some(dec!(2))),
        ];
        let months: Vec<NaiveDate> = monthly_sales(&orders)
            .expect("sales")
            .iter()
            .map(|row| row.month)
            .collect();
        assert_eq!(months, vec![date(2024, 1, 1), date(2024, 4, 1)]);
    }

    #[test]
    fn monthly_category_sales_groups_by_month_and_category() {
        let rows = monthly_category_sales(&example_orders()).expect("category sales");
        let keys: Vec<(NaiveDate, &str, u64)> = rows
            .iter()
            .map(|row| (row.month, row.product_category.as_str(), row.order_count))
            .collect();
        assert_eq!(
            keys,
            vec![
                (date(2024, 1, 1), "Books", 1),
                (date(2024, 1, 1), "Toys", 1),
                (date(2024, 2, 1), "Books", 1),
            ]
        );
    }

    #[test]
    fn monthly_spend_excludes_missing_values_and_undated_records() {
        let january = date(2024, 1, 1);
        let february = date(2024, 2, 1);
        let mut undated = spend(january, Some(dec!(1000)));
        undated.month = None;

        let records = vec![
            spend(january, Some(dec!(10))),
            spend(january, None),
            spend(january, Some(dec!(5.5))),
            spend(february, None),
            undated,
        ];

        let totals = monthly_spend(&records).expect("spend");
        assert_eq!(
            totals,
            vec![
                MonthlySpend {
                    month: january,
                    marketing_spend: Some(dec!(15.5)),
                    record_count: 3,
                },
                MonthlySpend {
                    month: february,
                    marketing_spend: None,
                    record_count: 1,
                },
            ]
        );
    }

    #[test]
    fn join_keeps_every_sales_month_and_drops_spend_only_months() {
        let sales = monthly_sales(&example_orders()).expect("sales");
        let spend_rows = monthly_spend(&[
            spend(date(2024, 1, 1), Some(dec!(75))),
            spend(date(2024, 6, 1), Some(dec!(40))),
        ])
        .expect("spend");

        let joined = join_sales_and_spend(&sales, &spend_rows);
        assert_eq!(joined.len(), sales.len());
        assert_eq!(joined[0].month, date(2024, 1, 1));
        assert_eq!(joined[0].marketing_spend, Some(dec!(75)));
        assert_eq!(joined[1].month, date(2024, 2, 1));
        assert_eq!(joined[1].marketing_spend, None);
        assert!(joined.iter().all(|row| row.month != date(2024, 6, 1)));
    }

    #[test]
    fn join_with_no_spend_at_all_keeps_sales_rows() {
        let sales = monthly_sales(&example_orders()).expect("sales");
        let joined = join_sales_and_spend(&sales, &[]);
        assert_eq!(joined.len(), 2);
        assert!(joined.iter().all(|row| row.marketing_spend.is_none()));
    }

    #[test]
    fn spend_total_beyond_decimal_range_is_an_error_not_a_panic() {
        let huge = crate::util::parse_amount("5e28");
        assert!(huge.is_some());
        let records = vec![spend(date(2024, 1, 1), huge), spend(date(2024, 1, 1), huge)];

        let err = monthly_spend(&records).expect_err("sum must overflow");
        assert!(err.to_string().contains("2024-01"), "{err}");
    }

    #[test]
    fn sales_total_beyond_decimal_range_is_an_error_not_a_panic() {
        let orders = vec![
            order(2, "C1", "2024-05-01", Some(Decimal::MAX)),
            order(4, "C2", "2024-05-02", Some(Decimal::MAX)),
        ];

        assert!(monthly_sales(&orders).is_err());
        assert!(monthly_category_sales(&orders).is_err());
    }
}
