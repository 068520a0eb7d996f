use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::model::OrderRecord;
use crate::util::{parse_amount, parse_calendar_date};

/// Snapshot read of the full order ledger.
pub trait OrderSource {
    fn load_orders(&self) -> Result<Vec<OrderRecord>>;
}

pub struct SqliteOrderStore {
    connection: Connection,
    query: String,
}

impl SqliteOrderStore {
    pub fn open(db_path: &Path, query: &str) -> Result<Self> {
        if !db_path.exists() {
            bail!(
                "order database not found: {} (run `spendrecon bootstrap` first)",
                db_path.display()
            );
        }

        let connection = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open database read-only: {}", db_path.display()))?;

        Ok(Self::from_connection(connection, query))
    }

    pub fn from_connection(connection: Connection, query: &str) -> Self {
        Self {
            connection,
            query: query.to_string(),
        }
    }
}

impl OrderSource for SqliteOrderStore {
    fn load_orders(&self) -> Result<Vec<OrderRecord>> {
        let mut statement = self
            .connection
            .prepare(&self.query)
            .context("failed to prepare orders query; does the orders table exist?")?;

        if statement.column_count() < 5 {
            bail!(
                "orders query must return order_id, customer_id, order_date, order_amount, product_category; got {} columns",
                statement.column_count()
            );
        }

        let mut rows = statement.query([]).context("failed to query orders")?;
        let mut out = Vec::new();

        while let Some(row) = rows.next()? {
            let order_id = value_to_text(row.get::<_, Value>(0)?);
            let order_date_raw = value_to_text(row.get::<_, Value>(2)?);
            let amount_raw = row.get::<_, Value>(3)?;

            let order = OrderRecord {
                order_date: parse_calendar_date(&order_date_raw),
                order_amount: value_to_amount(&amount_raw),
                customer_id: value_to_text(row.get::<_, Value>(1)?),
                product_category: value_to_text(row.get::<_, Value>(4)?),
                order_id,
            };

            if order.order_date.is_none() {
                debug!(order_id = %order.order_id, raw = %order_date_raw, "order date unparseable");
            }
            out.push(order);
        }

        info!(orders = out.len(), "loaded order snapshot");
        Ok(out)
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Text(text) => text.trim().to_string(),
        Value::Blob(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
    }
}

/// Coerces a stored amount to a decimal; anything non-numeric is missing.
fn value_to_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(number) => Some(Decimal::from(*number)),
        Value::Real(number) => Decimal::try_from(*number).ok(),
        Value::Text(text) => parse_amount(text),
    }
}
