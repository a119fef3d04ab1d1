use thiserror::Error;

/// Result type for all core analytics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Hard failures raised by the analytics core.
///
/// These are distinct from [`Availability::Unavailable`](crate::Availability),
/// which is the designed, non-exceptional answer when an *optional* analytic
/// column is missing from the uploaded table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input table is malformed: no rows or no columns.
    #[error("malformed input table: {0}")]
    Schema(String),

    /// The caller named a field that is absent from the schema, or of the
    /// wrong kind for the operation.
    #[error("field '{field}': {reason}")]
    Field { field: String, reason: String },

    /// The operation needs at least one usable row and got none.
    #[error("operation requires at least one row")]
    EmptyInput,
}

impl Error {
    /// Shorthand for the common "field is missing / mistyped" case.
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Field {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
