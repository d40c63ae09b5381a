//! Error types for the cash dispenser.

use thiserror::Error;

/// Result type alias for machine-level operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Category of a failed dispense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidAmount,
    NoStock,
    OverLimit,
    InsufficientStock,
    Store,
}

/// Why a dispense attempt was rejected.
///
/// Every variant leaves the inventory exactly as it was before the call.
#[derive(Error, Debug)]
pub enum DispenseError {
    /// Requested amount was zero or negative
    #[error("Can't withdraw non-positive amount ${0}.")]
    InvalidAmount(i64),

    /// No denominations are configured in the machine
    #[error("There is no cash in the machine.")]
    NoStock,

    /// Requested amount exceeds the withdrawal ceiling; `supplied` is the ceiling
    #[error(
        "Sorry, the amount ${required} is over your withdraw limitation. \
         The amount you can withdraw is ${supplied} today."
    )]
    OverLimit { required: u64, supplied: u64 },

    /// Current stock cannot produce the exact amount; `supplied` is the closest it got
    #[error(
        "Sorry, this ATM cannot supply the amount required ${required} with current stock. \
         The closest amount that can be supplied is ${supplied}. Please try again later."
    )]
    InsufficientStock { required: u64, supplied: u64 },

    /// The inventory store failed to load or persist
    #[error("Inventory store error: {0}")]
    Store(#[from] StoreError),
}

impl DispenseError {
    /// Returns the failure category.
    pub fn kind(&self) -> FailureKind {
        match self {
            DispenseError::InvalidAmount(_) => FailureKind::InvalidAmount,
            DispenseError::NoStock => FailureKind::NoStock,
            DispenseError::OverLimit { .. } => FailureKind::OverLimit,
            DispenseError::InsufficientStock { .. } => FailureKind::InsufficientStock,
            DispenseError::Store(_) => FailureKind::Store,
        }
    }

    /// Amount the caller asked for, where the failure carries one.
    pub fn required(&self) -> Option<u64> {
        match self {
            DispenseError::OverLimit { required, .. }
            | DispenseError::InsufficientStock { required, .. } => Some(*required),
            _ => None,
        }
    }

    /// Amount the machine could have supplied, where the failure carries one.
    pub fn supplied(&self) -> Option<u64> {
        match self {
            DispenseError::OverLimit { supplied, .. }
            | DispenseError::InsufficientStock { supplied, .. } => Some(*supplied),
            _ => None,
        }
    }
}

/// Errors raised by inventory stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A persisted stock row could not be interpreted
    #[error("Invalid stock record at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Two entries share the same face value
    #[error("Duplicate denomination ${0}")]
    DuplicateDenomination(u32),

    /// Face values must be positive
    #[error("Denomination value must be positive")]
    ZeroDenomination,
}

/// Errors raised by transaction recorders.
///
/// These are logged by the engine and never undo a committed dispense.
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors that can occur while running the machine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to open or read an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Inventory store failure outside of a dispense
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Machine operation failed
    #[error(transparent)]
    Dispense(#[from] DispenseError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Missing request file argument
    #[error("Missing request file argument. Usage: cash-dispenser <requests.csv> [stock.csv]")]
    MissingArgument,
}
