use thiserror::Error;

/// Fatal configuration and input errors.
///
/// Everything here aborts a run before aggregation starts. Data quality
/// problems in individual job records are not errors; see
/// [`crate::core_hours::DataQualityWarning`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountingError {
    #[error("invalid date range '{0}': expected [DATE][-[DATE]] with DATE as YYYY[MM[DD[HH[MM[SS]]]]]")]
    InvalidDateRange(String),
    #[error("invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },
    #[error("invalid quantity '{0}': expected an integer, a K/M/G/T or k/m/g/t suffixed number, or HH:MM:SS")]
    InvalidQuantity(String),
    #[error("invalid hostname pattern '{pattern}': {reason}")]
    InvalidHostnamePattern { pattern: String, reason: String },
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T, E = AccountingError> = std::result::Result<T, E>;
