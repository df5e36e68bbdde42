//! Shared `$...*HH` payload splitting.

use crate::ParseError;
use std::str::FromStr;

/// Comma-separated fields of a `$`-framed sentence, field 0 being the
/// address (e.g. `GPGGA`).
///
/// The frame must start with `$` and its first `*` must sit at least three
/// characters before the end.
pub(crate) fn split_fields(raw: &str, min_fields: usize) -> Result<Vec<&str>, ParseError> {
    let msg = raw.trim();
    if msg.is_empty() {
        return Err(ParseError::Empty);
    }
    let star = msg.find('*').ok_or(ParseError::MissingDelimiters)?;
    if !msg.starts_with('$') || star == 0 || star + 3 > msg.len() {
        return Err(ParseError::MissingDelimiters);
    }
    let payload = msg.get(1..star).ok_or(ParseError::MissingDelimiters)?;
    let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
    if fields.len() < min_fields {
        return Err(ParseError::TooFewFields {
            expected: min_fields,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Parse a numeric field, rejecting NaN and infinities.
pub(crate) fn parse_f64(field: &'static str, value: &str) -> Result<f64, ParseError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

pub(crate) fn parse_int<T: FromStr>(field: &'static str, value: &str) -> Result<T, ParseError> {
    value.parse::<T>().map_err(|_| ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields() {
        let fields = split_fields("  $GPHDT, 123.4 ,T*31\r\n", 2).unwrap();
        assert_eq!(fields, vec!["GPHDT", "123.4", "T"]);
    }

    #[test]
    fn test_delimiters_required() {
        assert_eq!(split_fields("GPHDT,1,T*31", 2), Err(ParseError::MissingDelimiters));
        assert_eq!(split_fields("$GPHDT,1,T*3", 2), Err(ParseError::MissingDelimiters));
        assert_eq!(split_fields("$GPHDT,1,T", 2), Err(ParseError::MissingDelimiters));
        assert_eq!(split_fields("   ", 2), Err(ParseError::Empty));
    }

    #[test]
    fn test_too_few_fields() {
        assert_eq!(
            split_fields("$GPHDT*00", 2),
            Err(ParseError::TooFewFields {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(parse_f64("heading", "NaN").is_err());
        assert!(parse_f64("heading", "inf").is_err());
        assert_eq!(parse_f64("heading", "1.5"), Ok(1.5));
    }
}
