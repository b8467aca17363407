use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayrollError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid ranking table: {0}")]
    InvalidRange(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("No {entity} with id {id}")]
    LookupMiss { entity: &'static str, id: i64 },

    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Role '{role}' is not allowed to {action}")]
    Forbidden { role: String, action: String },

    #[error("Not eligible: {0}")]
    Ineligible(String),

    #[error("Unknown loan type: {0}")]
    UnknownLoanType(String),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PayrollError>;
