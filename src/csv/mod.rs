use std::{collections::HashSet, fs::File, io::ErrorKind, path::Path};

use chrono::NaiveDate;
use csv::Reader;
use itertools::Itertools;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    domain::{error::RejectReason, transaction::Transaction},
    error::{Error, Result},
};

/// Accepted date encodings, tried in order; the first match wins.
/// An ambiguous dash-separated date is resolved by this order, not by
/// locale.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m-%d-%Y"];

/// Raw CSV row, matched to the header by field name so column order in
/// the file is irrelevant.
#[derive(Debug, Deserialize)]
struct RawRow {
    transaction_id: String,
    user_id: String,
    transaction_date: String,
    amount: String,
    category: String,
}

/// Parse and validate [`Transaction`]s from a CSV file, in file order.
///
/// Only a missing or unreadable file aborts the run. Every other
/// problem is scoped to its row: the row is skipped with a warning and
/// processing continues, so one bad row never sinks the batch.
pub fn process_file(path: impl AsRef<Path>) -> Result<Vec<Transaction>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::FileError(err),
    })?;

    let mut seen_ids = HashSet::new();
    let mut transactions = Vec::new();
    let mut rejected = Vec::new();

    for row in Reader::from_reader(file).into_deserialize::<RawRow>() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!("Skipping malformed row: {err}");
                continue;
            }
        };
        match clean_row(row, &mut seen_ids) {
            Ok(transaction) => transactions.push(transaction),
            Err(reason) => rejected.push(reason),
        }
    }

    if !rejected.is_empty() {
        let by_reason = rejected
            .iter()
            .counts()
            .into_iter()
            .map(|(reason, count)| format!("{count} x {reason}"))
            .sorted()
            .join(", ");
        warn!("Skipped {} invalid rows: {by_reason}", rejected.len());
    }
    info!(
        "Processed {} valid transactions from {}",
        transactions.len(),
        path.display()
    );

    Ok(transactions)
}

/// Validate one raw row. Checks run in a fixed order and stop at the
/// first failure, so a row is rejected for exactly one reason.
fn clean_row(
    row: RawRow,
    seen_ids: &mut HashSet<String>,
) -> std::result::Result<Transaction, RejectReason> {
    // The id is claimed before anything else is looked at: once seen in
    // this run it is never considered again, valid row or not.
    if !seen_ids.insert(row.transaction_id.clone()) {
        warn!("Duplicate transaction_id: {}", row.transaction_id);
        return Err(RejectReason::Duplicate);
    }

    let amount = match row.amount.trim().parse::<f64>() {
        Ok(amount) if amount > 0.0 => amount,
        _ => {
            warn!(
                "Invalid amount {:?} for transaction {}",
                row.amount, row.transaction_id
            );
            return Err(RejectReason::InvalidAmount);
        }
    };

    let Some(transaction_date) = parse_date(&row.transaction_date) else {
        warn!(
            "Invalid date format for transaction {}: {}",
            row.transaction_id, row.transaction_date
        );
        return Err(RejectReason::InvalidDate);
    };

    let Ok(user_id) = row.user_id.trim().parse::<i64>() else {
        warn!("Invalid user_id for transaction {}", row.transaction_id);
        return Err(RejectReason::InvalidUserId);
    };

    let category = row.category.trim();
    if category.is_empty() {
        warn!("Empty category for transaction {}", row.transaction_id);
        return Err(RejectReason::EmptyCategory);
    }

    Ok(Transaction {
        transaction_id: row.transaction_id,
        user_id,
        transaction_date,
        amount,
        category: category.to_string(),
    })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn raw(id: &str, user: &str, date: &str, amount: &str, category: &str) -> RawRow {
        RawRow {
            transaction_id: id.to_string(),
            user_id: user.to_string(),
            transaction_date: date.to_string(),
            amount: amount.to_string(),
            category: category.to_string(),
        }
    }

    fn clean(row: RawRow) -> std::result::Result<Transaction, RejectReason> {
        clean_row(row, &mut HashSet::new())
    }

    #[test]
    fn valid_row_yields_normalized_transaction() {
        let tx = clean(raw("t1", "42", "2023-01-15", "9.99", "  Groceries ")).unwrap();
        assert_eq!(tx.transaction_id, "t1");
        assert_eq!(tx.user_id, 42);
        assert_eq!(
            tx.transaction_date,
            NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()
        );
        assert_eq!(tx.amount, 9.99);
        assert_eq!(tx.category, "Groceries");
    }

    #[test]
    fn amount_must_be_strictly_positive() {
        assert_eq!(
            clean(raw("t1", "1", "2023-01-15", "0", "Food")),
            Err(RejectReason::InvalidAmount)
        );
        assert_eq!(
            clean(raw("t2", "1", "2023-01-15", "-5.0", "Food")),
            Err(RejectReason::InvalidAmount)
        );
        assert!(clean(raw("t3", "1", "2023-01-15", "0.01", "Food")).is_ok());
        assert_eq!(
            clean(raw("t4", "1", "2023-01-15", "ten", "Food")),
            Err(RejectReason::InvalidAmount)
        );
    }

    #[test]
    fn all_three_date_encodings_resolve_to_the_same_day() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        for encoded in ["2023-01-15", "15/01/2023", "01-15-2023"] {
            assert_eq!(parse_date(encoded), Some(expected), "{encoded}");
        }
        assert_eq!(parse_date("not-a-date"), None);
    }

    #[test]
    fn ambiguous_dash_date_is_read_month_first() {
        // "03-04-2023" only matches the %m-%d-%Y fallback, so it is
        // March 4th regardless of what the source meant.
        assert_eq!(
            parse_date("03-04-2023"),
            Some(NaiveDate::from_ymd_opt(2023, 3, 4).unwrap())
        );
    }

    #[test]
    fn invalid_user_id_is_rejected() {
        assert_eq!(
            clean(raw("t1", "abc", "2023-01-15", "1.0", "Food")),
            Err(RejectReason::InvalidUserId)
        );
    }

    #[test]
    fn blank_category_is_rejected() {
        assert_eq!(
            clean(raw("t1", "1", "2023-01-15", "1.0", "   ")),
            Err(RejectReason::EmptyCategory)
        );
    }

    #[test]
    fn first_failing_check_wins() {
        // Bad amount and bad date on the same row: the amount check
        // runs first, so that is the reported reason.
        assert_eq!(
            clean(raw("t1", "1", "nope", "-1", "Food")),
            Err(RejectReason::InvalidAmount)
        );
    }

    #[test]
    fn id_is_claimed_even_when_the_row_is_invalid() {
        let mut seen = HashSet::new();
        assert_eq!(
            clean_row(raw("t1", "1", "2023-01-15", "-1", "Food"), &mut seen),
            Err(RejectReason::InvalidAmount)
        );
        // Same id with valid data is still a duplicate for this run.
        assert_eq!(
            clean_row(raw("t1", "1", "2023-01-15", "1.0", "Food"), &mut seen),
            Err(RejectReason::Duplicate)
        );
    }

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn process_file_keeps_good_rows_and_drops_bad_ones() {
        let file = write_csv(
            "transaction_id,user_id,transaction_date,amount,category\n\
             t1,1,2023-01-15,100.0,Groceries\n\
             t2,2,not-a-date,50.0,Groceries\n\
             t3,x,2023-01-16,50.0,Groceries\n\
             t4,3,2023-01-17,200.0,Electronics\n",
        );
        let transactions = process_file(file.path()).unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].transaction_id, "t1");
        assert_eq!(transactions[1].transaction_id, "t4");
    }

    #[test]
    fn process_file_dedupes_within_the_batch() {
        let file = write_csv(
            "transaction_id,user_id,transaction_date,amount,category\n\
             t1,1,2023-01-15,100.0,Groceries\n\
             t1,1,2023-01-15,100.0,Groceries\n",
        );
        let transactions = process_file(file.path()).unwrap();
        assert_eq!(transactions.len(), 1);
    }

    #[test]
    fn header_order_does_not_matter() {
        let file = write_csv(
            "category,amount,transaction_date,user_id,transaction_id\n\
             Groceries,100.0,2023-01-15,1,t1\n",
        );
        let transactions = process_file(file.path()).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].category, "Groceries");
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = process_file("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
