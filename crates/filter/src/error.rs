//! Filter error types

use thiserror::Error;

/// Errors from the rule parser and serializer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    /// The rule text is malformed: wrong field count, an empty or
    /// non-numeric value, a value outside its range, or a stray separator.
    ///
    /// All grammar failures collapse into this one value and the parse
    /// produces no partial rule set.
    #[error("invalid filter rule set")]
    InvalidRules,

    /// A separator character set passed to parse or serialize is empty
    #[error("separator set is empty")]
    InvalidSeparators,
}

/// Type alias for filter results
pub type Result<T> = std::result::Result<T, FilterError>;
