use thiserror::Error;

/// Why a sentence could not be turned into an [`fpu_core::FpuUpdate`].
///
/// A parse error never touches device state; the dispatcher logs it and
/// moves on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Blank sentence text.
    #[error("empty sentence")]
    Empty,

    /// Missing leading `$` or a `*` too close to the end.
    #[error("missing sentence delimiters")]
    MissingDelimiters,

    /// Fewer comma-separated fields than the sentence type needs.
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    /// A numeric field did not parse.
    #[error("invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// Day, month, year or time of day do not form a real instant.
    #[error("invalid date or time")]
    InvalidDate,

    /// The fixed-width motion layout did not match.
    #[error("motion sentence does not match the fixed layout")]
    NoMatch,

    /// A value parsed but falls outside its valid range.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}
