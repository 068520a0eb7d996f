use std::fs;

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::info;

use crate::cli::BootstrapArgs;
use crate::config::resolve_db_path;
use crate::util::ensure_directory;

pub fn run(args: BootstrapArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.workspace_root, args.db_path.as_deref());
    if let Some(parent) = db_path.parent() {
        ensure_directory(parent)?;
    }

    let script = fs::read_to_string(&args.sql_script)
        .with_context(|| format!("failed to read {}", args.sql_script.display()))?;

    info!(
        db_path = %db_path.display(),
        script = %args.sql_script.display(),
        "bootstrapping order store"
    );

    let connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    apply_script(&connection, &script)?;

    let order_count = count_orders(&connection)?;
    info!(orders = order_count, "order table ready");

    for line in preview_orders(&connection, args.preview_rows)? {
        info!(row = %line, "order preview");
    }

    Ok(())
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

/// Runs the whole script in one transaction so a failing statement leaves
/// the store untouched. Scripts that open their own transaction (such as
/// `sqlite3 .dump` output) run as written.
fn apply_script(connection: &Connection, script: &str) -> Result<()> {
    let batch = if opens_own_transaction(script)? {
        script.to_string()
    } else {
        format!("BEGIN;\n{script}\nCOMMIT;")
    };

    connection
        .execute_batch(&batch)
        .inspect_err(|_| {
            if !connection.is_autocommit() {
                let _ = connection.execute_batch("ROLLBACK;");
            }
        })
        .context("failed to execute bootstrap script")
}

fn opens_own_transaction(script: &str) -> Result<bool> {
    let begin = Regex::new(
        r"(?im)^\s*BEGIN(?:\s+(?:DEFERRED|IMMEDIATE|EXCLUSIVE))?(?:\s+TRANSACTION)?\s*;",
    )
    .context("failed to compile transaction regex")?;
    Ok(begin.is_match(script))
}

pub(crate) fn count_orders(connection: &Connection) -> Result<i64> {
    connection
        .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
        .context("failed to count orders; does the orders table exist?")
}

fn preview_orders(connection: &Connection, limit: usize) -> Result<Vec<String>> {
    let mut statement = connection
        .prepare("SELECT * FROM orders LIMIT ?1")
        .context("failed to prepare orders preview")?;
    let column_count = statement.column_count();

    let mut rows = statement.query([preview_limit(limit)])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(column_count);
        for index in 0..column_count {
            cells.push(render_value(row.get::<_, Value>(index)?));
        }
        out.push(format!("({})", cells.join(", ")));
    }

    Ok(out)
}

// SQLite reads a negative LIMIT as "no limit".
fn preview_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn render_value(value: Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Text(text) => format!("'{text}'"),
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "
        CREATE TABLE IF NOT EXISTS orders (
          order_id INTEGER PRIMARY KEY,
          customer_id TEXT NOT NULL,
          order_date TEXT NOT NULL,
          order_amount REAL,
          product_category TEXT
        );
        INSERT INTO orders VALUES (1, 'C1', '2024-01-05', 100.0, 'Books');
        INSERT INTO orders VALUES (2, 'C2', '2024-02-01', NULL, 'Toys');
    ";

    #[test]
    fn script_creates_orders_and_preview_renders_rows() {
        let connection = Connection::open_in_memory().expect("in-memory db");
        apply_script(&connection, SCRIPT).expect("script should apply");

        assert_eq!(count_orders(&connection).expect("count"), 2);
        let preview = preview_orders(&connection, 1).expect("preview");
        assert_eq!(preview, vec!["(1, 'C1', '2024-01-05', 100, 'Books')".to_string()]);
    }

    #[test]
    fn failing_script_rolls_back() {
        let connection = Connection::open_in_memory().expect("in-memory db");
        apply_script(&connection, SCRIPT).expect("script should apply");

        let broken = "INSERT INTO orders VALUES (3, 'C3', '2024-03-01', 1.0, 'Books'); SELEKT 1;";
        assert!(apply_script(&connection, broken).is_err());
        assert_eq!(count_orders(&connection).expect("count"), 2);
    }

    #[test]
    fn count_without_table_is_an_error() {
        let connection = Connection::open_in_memory().expect("in-memory db");
        assert!(count_orders(&connection).is_err());
    }

    #[test]
    fn dump_style_script_with_its_own_transaction_applies() {
        let connection = Connection::open_in_memory().expect("in-memory db");
        let dump = format!("PRAGMA foreign_keys=OFF;\nBEGIN TRANSACTION;\n{SCRIPT}\nCOMMIT;\n");

        apply_script(&connection, &dump).expect("dump should apply");
        assert_eq!(count_orders(&connection).expect("count"), 2);
        assert!(connection.is_autocommit());
    }

    #[test]
    fn failing_dump_style_script_rolls_back() {
        let connection = Connection::open_in_memory().expect("in-memory db");
        apply_script(&connection, SCRIPT).expect("script should apply");

        let broken = "begin;\nINSERT INTO orders VALUES (3, 'C3', '2024-03-01', 1.0, 'Books');\n\
                      SELEKT 1;\nCOMMIT;";
        assert!(apply_script(&connection, broken).is_err());
        assert!(connection.is_autocommit());
        assert_eq!(count_orders(&connection).expect("count"), 2);
    }

    #[test]
    fn trigger_bodies_are_not_mistaken_for_transactions() {
        let trigger = "CREATE TRIGGER t AFTER INSERT ON orders\nBEGIN\n  SELECT 1;\nEND;";
        assert!(!opens_own_transaction(trigger).expect("regex"));
        assert!(opens_own_transaction("BEGIN TRANSACTION;").expect("regex"));
        assert!(opens_own_transaction("  begin immediate;").expect("regex"));
    }

    #[test]
    fn oversized_preview_limit_saturates_instead_of_wrapping() {
        assert_eq!(preview_limit(5), 5);
        assert_eq!(preview_limit(usize::MAX), i64::MAX);
    }
}
