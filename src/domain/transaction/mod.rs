use chrono::NaiveDate;

/// One validated ledger entry.
///
/// Constructed only by the intake pipeline and immutable afterwards;
/// `transaction_id` is the natural key the store enforces uniqueness on.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub transaction_id: String,
    pub user_id: i64,
    pub transaction_date: NaiveDate,
    pub amount: f64,
    pub category: String,
}
