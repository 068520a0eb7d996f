use std::collections::HashMap;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use crate::model::{CustomerRanking, OrderRecord};

/// Customers by total spend, descending. `sort_by` is stable, so equal totals
/// keep the order in which customers first appear in `orders`.
pub fn top_customers(orders: &[OrderRecord], limit: usize) -> Result<Vec<CustomerRanking>> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut customers: Vec<CustomerRanking> = Vec::new();

    for order in orders {
        let index = *position.entry(order.customer_id.as_str()).or_insert_with(|| {
            customers.push(CustomerRanking {
                customer_id: order.customer_id.clone(),
                orders_count: 0,
                total_spent: Decimal::ZERO,
            });
            customers.len() - 1
        });

        let customer = &mut customers[index];
        customer.orders_count += 1;
        if let Some(amount) = order.order_amount {
            customer.total_spent =
                customer.total_spent.checked_add(amount).with_context(|| {
                    format!(
                        "total spent by customer {} exceeds the decimal range",
                        customer.customer_id
                    )
                })?;
        }
    }

    customers.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
    customers.truncate(limit);
    Ok(customers)
}
