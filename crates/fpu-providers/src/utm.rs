//! WGS84 to UTM projection.
//!
//! The series math lives in the `utm` crate. This module fixes the zone
//! rule (plain 6° bands, no Norway or Svalbard exceptions) and the
//! hemisphere flag, and maps results onto [`UtmPosition`].

use fpu_core::UtmPosition;

/// UTM zone for a longitude, `floor((lon + 180) / 6) + 1` clamped to 1..=60.
pub fn zone_for(lon: f64) -> u8 {
    let zone = ((lon + 180.0) / 6.0).floor() + 1.0;
    zone.clamp(1.0, 60.0) as u8
}

/// Central meridian of a zone, in degrees.
pub fn central_meridian(zone: u8) -> f64 {
    (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
}

/// Project geographic degrees to UTM. Hemisphere is north when `lat >= 0`.
pub fn to_utm(lon: f64, lat: f64) -> UtmPosition {
    let zone = zone_for(lon);
    let (northing, easting, _convergence) = ::utm::to_utm_wgs84(lat, lon, zone);
    UtmPosition {
        easting,
        northing,
        zone,
        north: lat >= 0.0,
    }
}

/// Inverse projection, returning `(lon, lat)` in degrees. `None` when the
/// position lies outside the UTM grid.
pub fn from_utm(position: &UtmPosition) -> Option<(f64, f64)> {
    let band = if position.north { 'N' } else { 'M' };
    let (lat, lon) =
        ::utm::wsg84_utm_to_lat_lon(position.easting, position.northing, position.zone, band).ok()?;
    Some((lon, lat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_meridian_on_equator() {
        let p = to_utm(3.0, 0.0);
        assert_eq!(p.zone, 31);
        assert!(p.north);
        assert!((p.easting - 500_000.0).abs() < 1e-6);
        assert!(p.northing.abs() < 1e-6);
    }

    #[test]
    fn test_zone_numbers() {
        assert_eq!(zone_for(-180.0), 1);
        assert_eq!(zone_for(11.5167), 32);
        assert_eq!(zone_for(179.999), 60);
        assert_eq!(zone_for(180.0), 60);
        assert_eq!(central_meridian(32), 9.0);
    }

    #[test]
    fn test_no_norway_exception() {
        // Bergen sits in band V where the grid extends zone 32 westward.
        assert_eq!(to_utm(5.3, 60.4).zone, 31);
    }

    #[test]
    fn test_known_point() {
        // Munich area, zone 32U
        let p = to_utm(11.5167, 48.1173);
        assert_eq!(p.zone, 32);
        assert!(p.north);
        assert!((p.easting - 687_302.06).abs() < 0.5, "{}", p.easting);
        assert!((p.northing - 5_332_401.33).abs() < 0.5, "{}", p.northing);
    }

    #[test]
    fn test_southern_hemisphere_false_northing() {
        let p = to_utm(-58.38, -34.6);
        assert!(!p.north);
        assert_eq!(p.zone, 21);
        assert!(p.northing > 6_000_000.0 && p.northing < 7_000_000.0);
    }

    #[test]
    fn test_round_trip() {
        for &(lon, lat) in &[
            (11.5167, 48.1173),
            (-11.5167, -48.1173),
            (3.0, 0.0),
            (-70.1, -53.2),
            (151.2, -33.9),
            (2.9, 79.9),
        ] {
            let p = to_utm(lon, lat);
            let (lon2, lat2) = from_utm(&p).unwrap();
            assert!((lon - lon2).abs() < 5e-6, "lon {lon} -> {lon2}");
            assert!((lat - lat2).abs() < 5e-6, "lat {lat} -> {lat2}");
        }
    }

    #[test]
    fn test_off_grid_inverse() {
        let p = UtmPosition {
            easting: 5_000.0,
            northing: 1_000.0,
            zone: 32,
            north: true,
        };
        assert_eq!(from_utm(&p), None);
    }
}
