//! ZDA: UTC time, date and local zone offset.

use crate::fields::{parse_f64, parse_int, split_fields};
use crate::ParseError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use fpu_core::FpuUpdate;

/// Time of day split from an `HHMMSS[.sss]` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub millis: u32,
}

/// Parse `HHMMSS[.sss]`.
///
/// Fractional seconds round to the nearest millisecond. A rounding carry
/// ripples into seconds, minutes and hours, and hours wrap at 24 without
/// touching the date.
pub fn parse_time_of_day(value: &str) -> Result<TimeOfDay, ParseError> {
    let invalid = || ParseError::InvalidNumber {
        field: "time",
        value: value.to_string(),
    };
    let digits = value.as_bytes().get(..6).ok_or_else(invalid)?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    let hour: u32 = value.get(0..2).ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    let minute: u32 = value.get(2..4).ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    let seconds = parse_f64("time", value.get(4..).ok_or_else(invalid)?)?;

    if hour >= 24 || minute >= 60 || !(0.0..60.0).contains(&seconds) {
        return Err(ParseError::InvalidDate);
    }

    let mut second = seconds.floor() as u32;
    let mut millis = ((seconds - seconds.floor()) * 1000.0).round() as u32;
    let (mut minute, mut hour) = (minute, hour);
    if millis >= 1000 {
        millis = 0;
        second += 1;
    }
    if second >= 60 {
        second -= 60;
        minute += 1;
    }
    if minute >= 60 {
        minute -= 60;
        hour += 1;
    }
    if hour >= 24 {
        hour -= 24;
    }

    Ok(TimeOfDay {
        hour,
        minute,
        second,
        millis,
    })
}

/// Zone offset from the ZDA hour and minute fields.
///
/// The sign of the hour field applies to both parts, so `-00,30` is half an
/// hour west. Returns `None` when either part is missing, malformed, or the
/// offset is not a representable zone.
pub fn parse_zone_offset(hours: &str, minutes: &str) -> Option<FixedOffset> {
    if hours.is_empty() || minutes.is_empty() {
        return None;
    }
    let h: i32 = hours.parse().ok()?;
    let m: i32 = minutes.parse().ok()?;
    let sign = if hours.starts_with('-') { -1 } else { 1 };
    let seconds = sign * (h.abs() * 3600 + m.abs() * 60);
    FixedOffset::east_opt(seconds)
}

/// Parse `$xxZDA,hhmmss.ss,dd,mm,yyyy,zh,zm*HH`.
///
/// Any malformed time or date field fails the whole sentence. A bad zone
/// offset only drops the local time.
pub fn parse_time(raw: &str) -> Result<FpuUpdate, ParseError> {
    let fields = split_fields(raw, 7)?;

    let tod = parse_time_of_day(fields[1])?;
    let day: u32 = parse_int("day", fields[2])?;
    let month: u32 = parse_int("month", fields[3])?;
    let year: i32 = parse_int("year", fields[4])?;

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(ParseError::InvalidDate)?;
    let time = NaiveTime::from_hms_milli_opt(tod.hour, tod.minute, tod.second, tod.millis)
        .ok_or(ParseError::InvalidDate)?;
    let utc: DateTime<Utc> = Utc.from_utc_datetime(&date.and_time(time));

    let local = parse_zone_offset(fields[5], fields[6]).map(|offset| utc.with_timezone(&offset));

    Ok(FpuUpdate::Time { utc, local })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SecondsFormat;
    use pretty_assertions::assert_eq;

    fn time_of(raw: &str) -> (DateTime<Utc>, Option<DateTime<FixedOffset>>) {
        match parse_time(raw).unwrap() {
            FpuUpdate::Time { utc, local } => (utc, local),
            other => panic!("unexpected update {other:?}"),
        }
    }

    fn fmt(t: DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    #[test]
    fn test_utc_without_zone() {
        let (utc, local) = time_of("$GPZDA,123519.00,01,02,2024,,*6C");
        assert_eq!(fmt(utc), "2024-02-01T12:35:19.000Z");
        assert_eq!(local, None);
    }

    #[test]
    fn test_positive_offset() {
        let (_, local) = time_of("$GPZDA,123519.00,01,02,2024,05,30*6A");
        let local = local.unwrap();
        assert_eq!(
            local.to_rfc3339_opts(SecondsFormat::Millis, true),
            "2024-02-01T18:05:19.000+05:30"
        );
    }

    #[test]
    fn test_negative_offset() {
        let (_, local) = time_of("$GPZDA,123519.00,01,02,2024,-05,00*44");
        assert_eq!(
            local.unwrap().to_rfc3339_opts(SecondsFormat::Millis, true),
            "2024-02-01T07:35:19.000-05:00"
        );
    }

    #[test]
    fn test_negative_zero_hours() {
        assert_eq!(parse_zone_offset("-00", "30"), FixedOffset::west_opt(1800));
        assert_eq!(parse_zone_offset("00", "30"), FixedOffset::east_opt(1800));
        assert_eq!(parse_zone_offset("05", ""), None);
        assert_eq!(parse_zone_offset("xx", "00"), None);
        assert_eq!(parse_zone_offset("30", "00"), None);
    }

    #[test]
    fn test_millisecond_carry_wraps_hours() {
        let (utc, _) = time_of("$GPZDA,235959.9996,31,12,2023,,*6A");
        assert_eq!(fmt(utc), "2023-12-31T00:00:00.000Z");
    }

    #[test]
    fn test_fraction_rounding() {
        let tod = parse_time_of_day("101010.1236").unwrap();
        assert_eq!(
            tod,
            TimeOfDay {
                hour: 10,
                minute: 10,
                second: 10,
                millis: 124
            }
        );
    }

    #[test]
    fn test_signed_time_fields_rejected() {
        for value in ["+12030.00", "1+3045.00", "12-345.00", " 23045.00", "1203+5.00"] {
            assert!(
                matches!(parse_time_of_day(value), Err(ParseError::InvalidNumber { .. })),
                "{value}"
            );
        }
        assert!(parse_time("$GPZDA,+12030.00,01,02,2024,,*00").is_err());
    }

    #[test]
    fn test_bad_fields_fail_whole_sentence() {
        assert!(parse_time("$GPZDA,12a519.00,01,02,2024,,*00").is_err());
        assert!(parse_time("$GPZDA,123519.00,xx,02,2024,,*00").is_err());
        assert_eq!(
            parse_time("$GPZDA,123519.00,30,02,2024,,*00"),
            Err(ParseError::InvalidDate)
        );
        assert_eq!(
            parse_time("$GPZDA,253519.00,01,02,2024,,*00"),
            Err(ParseError::InvalidDate)
        );
    }
}
