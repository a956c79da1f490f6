use thiserror::Error;

/// Why a row was dropped at intake.
///
/// Every reason is row-scoped: the offending row is skipped with a
/// warning and the rest of the batch goes on.
#[derive(Debug, Error, Clone, PartialEq, Eq, Hash)]
pub enum RejectReason {
    #[error("duplicate transaction id")]
    Duplicate,
    #[error("missing or non-positive amount")]
    InvalidAmount,
    #[error("unrecognized date format")]
    InvalidDate,
    #[error("invalid user id")]
    InvalidUserId,
    #[error("empty category")]
    EmptyCategory,
}
