use std::{fs, path::Path};

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::{domain::transaction::Transaction, error::Result};

/// Idempotent, append-only persistence for validated transactions.
///
/// Uniqueness is enforced by the primary key on `transaction_id`, so
/// re-loading a file that was already loaded is a safe no-op: the first
/// writer wins and later duplicates are absorbed silently.
pub struct LedgerStore {
    conn: Connection,
}

/// Read-side aggregate over the whole ledger at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_count: u64,
    /// Min and max transaction date, or `None` for an empty ledger.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Per-category stats, ordered by category name.
    pub category_stats: Vec<CategoryStat>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStat {
    pub category: String,
    pub count: u64,
    pub total_amount: f64,
    pub average_amount: f64,
}

impl LedgerStore {
    /// Open the ledger database at `path`, creating the file, its
    /// parent directory and the schema as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Ensure the schema exists. Safe against an already-initialized
    /// database.
    fn initialize(&self) -> Result<()> {
        // WAL keeps summary reads from blocking behind a concurrent
        // load from another process.
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                 transaction_id TEXT PRIMARY KEY,
                 user_id INTEGER NOT NULL,
                 transaction_date TEXT NOT NULL,
                 amount REAL NOT NULL,
                 category TEXT NOT NULL
             )",
            [],
        )?;
        debug!("Database initialized");
        Ok(())
    }

    /// Insert transactions in input order, skipping ids already present.
    ///
    /// The whole batch commits in one database transaction; any storage
    /// fault rolls everything back. Returns the number of rows actually
    /// added, which is zero when every id was already stored.
    pub fn save(&mut self, transactions: &[Transaction]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO transactions
                     (transaction_id, user_id, transaction_date, amount, category)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for transaction in transactions {
                inserted += stmt.execute(params![
                    transaction.transaction_id,
                    transaction.user_id,
                    transaction.transaction_date,
                    transaction.amount,
                    transaction.category,
                ])?;
            }
        }
        tx.commit()?;
        info!(
            "Saved {inserted} new transactions ({} given)",
            transactions.len()
        );
        Ok(inserted)
    }

    /// Aggregate the committed state of the ledger. Nothing is cached;
    /// every call reads the database afresh.
    pub fn summarize(&self) -> Result<Summary> {
        let total_count =
            self.conn
                .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

        let date_range = self.conn.query_row(
            "SELECT MIN(transaction_date), MAX(transaction_date) FROM transactions",
            [],
            |row| {
                let min: Option<NaiveDate> = row.get(0)?;
                let max: Option<NaiveDate> = row.get(1)?;
                Ok(min.zip(max))
            },
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*), SUM(amount), AVG(amount)
             FROM transactions
             GROUP BY category
             ORDER BY category",
        )?;
        let category_stats = stmt
            .query_map([], |row| {
                Ok(CategoryStat {
                    category: row.get(0)?,
                    count: row.get(1)?,
                    total_amount: row.get(2)?,
                    average_amount: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Summary {
            total_count,
            date_range,
            category_stats,
        })
    }
}
