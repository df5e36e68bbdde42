//! GGA: GPS fix, projected to UTM.

use crate::fields::{parse_f64, split_fields};
use crate::utm::to_utm;
use crate::ParseError;
use fpu_core::FpuUpdate;

/// Convert `DDMM.MMMM` / `DDDMM.MMMM` to decimal degrees.
pub fn nmea_to_degrees(value: f64) -> f64 {
    let degrees = (value / 100.0).floor();
    let minutes = value - degrees * 100.0;
    degrees + minutes / 60.0
}

/// Parse `$xxGGA,time,lat,N|S,lon,E|W,quality,...` into a projected fix.
///
/// A missing or malformed quality code is reported as 0; only the
/// coordinates are mandatory.
pub fn parse_fix(raw: &str) -> Result<FpuUpdate, ParseError> {
    let fields = split_fields(raw, 7)?;

    let lat_raw = parse_f64("latitude", fields[2])?;
    let lon_raw = parse_f64("longitude", fields[4])?;
    let quality = fields[6].parse::<i32>().unwrap_or(0);

    let mut latitude = nmea_to_degrees(lat_raw);
    if fields[3] == "S" {
        latitude = -latitude;
    }
    let mut longitude = nmea_to_degrees(lon_raw);
    if fields[5] == "W" {
        longitude = -longitude;
    }

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ParseError::OutOfRange {
            field: "latitude",
            value: latitude,
        });
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ParseError::OutOfRange {
            field: "longitude",
            value: longitude,
        });
    }

    Ok(FpuUpdate::Fix {
        position: to_utm(longitude, latitude),
        quality,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utm::from_utm;

    const MUNICH: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    #[test]
    fn test_nmea_to_degrees() {
        assert!((nmea_to_degrees(4807.038) - 48.1173).abs() < 1e-9);
        assert!((nmea_to_degrees(1131.0) - 11.516_666_666).abs() < 1e-6);
    }

    #[test]
    fn test_parse_fix() {
        let FpuUpdate::Fix { position, quality } = parse_fix(MUNICH).unwrap() else {
            panic!("expected a fix");
        };
        assert_eq!(quality, 1);
        assert_eq!(position.zone, 32);
        assert!(position.north);

        let (lon, lat) = from_utm(&position).unwrap();
        assert!((lat - 48.1173).abs() < 5e-6);
        assert!((lon - 11.516_666_7).abs() < 5e-6);
    }

    #[test]
    fn test_south_west() {
        let raw = "$GPGGA,123519,4807.038,S,01131.000,W,2,08,0.9,545.4,M,46.9,M,,*4B";
        let FpuUpdate::Fix { position, quality } = parse_fix(raw).unwrap() else {
            panic!("expected a fix");
        };
        assert_eq!(quality, 2);
        assert!(!position.north);
        assert_eq!(position.zone, 29);
        let (lon, lat) = from_utm(&position).unwrap();
        assert!((lat + 48.1173).abs() < 5e-6);
        assert!((lon + 11.516_666_7).abs() < 5e-6);
    }

    #[test]
    fn test_bad_quality_defaults_to_zero() {
        let raw = "$GPGGA,123519,4807.038,N,01131.000,E,x,08,0.9,545.4,M,46.9,M,,*0E";
        let FpuUpdate::Fix { quality, .. } = parse_fix(raw).unwrap() else {
            panic!("expected a fix");
        };
        assert_eq!(quality, 0);
    }

    #[test]
    fn test_empty_latitude_fails() {
        let raw = "$GPGGA,123519,,N,01131.000,E,0,00,,,M,,M,,*4C";
        assert!(matches!(
            parse_fix(raw),
            Err(ParseError::InvalidNumber { field: "latitude", .. })
        ));
    }

    #[test]
    fn test_too_few_fields() {
        assert!(matches!(
            parse_fix("$GPGGA,123519,4807.038,N*00"),
            Err(ParseError::TooFewFields { expected: 7, .. })
        ));
    }
}
