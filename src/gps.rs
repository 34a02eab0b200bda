//! Decimal-degree coordinates and their EXIF rational encoding.

use serde::{Deserialize, Serialize};

use crate::error::BatchError;
use crate::exif::{Section, TagValue, tag};

/// GPSVersionID written with every location.
pub const GPS_VERSION: [u8; 4] = [2, 0, 0, 0];

/// Seconds are stored as `n / 10000`, i.e. four decimal places.
pub const SECONDS_DENOMINATOR: u32 = 10_000;

/// A location picked by the user, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Reject non-finite or out-of-range values before a batch starts.
    pub fn validate(&self) -> Result<(), BatchError> {
        let valid = self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude);
        if valid {
            Ok(())
        } else {
            Err(BatchError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    pub fn to_gps_rational(&self) -> GpsRational {
        to_gps_rational(self.latitude, self.longitude)
    }
}

/// Degrees, minutes and seconds of one axis as EXIF rationals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dms {
    pub degrees: (u32, u32),
    pub minutes: (u32, u32),
    pub seconds: (u32, u32),
}

impl Dms {
    fn to_value(self) -> TagValue {
        TagValue::Rational(vec![self.degrees, self.minutes, self.seconds])
    }
}

/// A location in the form the GPS IFD stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsRational {
    pub version: [u8; 4],
    /// `b'N'` or `b'S'`
    pub latitude_ref: u8,
    pub latitude: Dms,
    /// `b'E'` or `b'W'`
    pub longitude_ref: u8,
    pub longitude: Dms,
}

impl GpsRational {
    /// The five GPS tags this location is written as.
    pub fn to_section(&self) -> Section {
        [
            (tag::GPS_VERSION_ID, TagValue::Byte(self.version.to_vec())),
            (tag::GPS_LATITUDE_REF, TagValue::Ascii(vec![self.latitude_ref, 0])),
            (tag::GPS_LATITUDE, self.latitude.to_value()),
            (tag::GPS_LONGITUDE_REF, TagValue::Ascii(vec![self.longitude_ref, 0])),
            (tag::GPS_LONGITUDE, self.longitude.to_value()),
        ]
        .into_iter()
        .collect()
    }
}

/// Encode decimal degrees as GPS rationals.
///
/// Seconds are truncated toward zero at four decimal places. Never fails: out-of-range or
/// non-finite input goes through the same arithmetic, and float-to-int casts saturate.
pub fn to_gps_rational(latitude: f64, longitude: f64) -> GpsRational {
    GpsRational {
        version: GPS_VERSION,
        latitude_ref: if latitude >= 0.0 { b'N' } else { b'S' },
        latitude: to_dms(latitude),
        longitude_ref: if longitude >= 0.0 { b'E' } else { b'W' },
        longitude: to_dms(longitude),
    }
}

fn to_dms(value: f64) -> Dms {
    let abs = value.abs();
    let degrees = abs.floor();
    let minutes_float = (abs - degrees) * 60.0;
    let minutes = minutes_float.floor();
    let seconds_float = (minutes_float - minutes) * 60.0;

    Dms {
        degrees: (degrees as u32, 1),
        minutes: (minutes as u32, 1),
        seconds: (
            (seconds_float * f64::from(SECONDS_DENOMINATOR)) as u32,
            SECONDS_DENOMINATOR,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_decimal(dms: &Dms) -> f64 {
        dms.degrees.0 as f64
            + dms.minutes.0 as f64 / 60.0
            + dms.seconds.0 as f64 / dms.seconds.1 as f64 / 3600.0
    }

    const SAMPLES: &[(f64, f64)] = &[
        (48.8566, 2.3522),
        (-33.8688, 151.2093),
        (40.7128, -74.0060),
        (-54.8019, -68.3030),
        (0.0, 0.0),
        (90.0, 180.0),
        (-90.0, -180.0),
        (89.999999, 179.999999),
        (0.000001, -0.000001),
    ];

    #[test]
    fn paris() {
        let gps = to_gps_rational(48.8566, 2.3522);
        assert_eq!(gps.version, [2, 0, 0, 0]);
        assert_eq!(gps.latitude_ref, b'N');
        assert_eq!(gps.longitude_ref, b'E');
        assert_eq!(gps.latitude.degrees, (48, 1));
        assert_eq!(gps.latitude.minutes, (51, 1));
        assert_eq!(gps.latitude.seconds.1, 10_000);
        // 23.76", give or take float noise in the last digit
        assert!((237_599..=237_600).contains(&gps.latitude.seconds.0));
        assert_eq!(gps.longitude.degrees, (2, 1));
        assert_eq!(gps.longitude.minutes, (21, 1));
    }

    #[test]
    fn components_stay_in_range() {
        for &(lat, lon) in SAMPLES {
            let gps = to_gps_rational(lat, lon);
            assert!(gps.latitude.degrees.0 <= 90, "{lat}");
            assert!(gps.longitude.degrees.0 <= 180, "{lon}");
            for dms in [gps.latitude, gps.longitude] {
                assert!(dms.minutes.0 < 60);
                assert!(dms.seconds.0 < 60 * SECONDS_DENOMINATOR);
                assert_eq!(dms.degrees.1, 1);
                assert_eq!(dms.minutes.1, 1);
                assert_eq!(dms.seconds.1, SECONDS_DENOMINATOR);
            }
        }
    }

    #[test]
    fn hemisphere_follows_sign() {
        for &(lat, lon) in SAMPLES {
            let gps = to_gps_rational(lat, lon);
            assert_eq!(gps.latitude_ref, if lat >= 0.0 { b'N' } else { b'S' });
            assert_eq!(gps.longitude_ref, if lon >= 0.0 { b'E' } else { b'W' });
        }
    }

    #[test]
    fn decodes_back_within_a_ten_thousandth_of_a_second() {
        let tolerance = 1.0 / f64::from(SECONDS_DENOMINATOR) / 3600.0 + 1e-12;
        for &(lat, lon) in SAMPLES {
            let gps = to_gps_rational(lat, lon);
            assert!((to_decimal(&gps.latitude) - lat.abs()).abs() <= tolerance, "{lat}");
            assert!((to_decimal(&gps.longitude) - lon.abs()).abs() <= tolerance, "{lon}");
        }
    }

    #[test]
    fn seconds_are_truncated_not_rounded() {
        // 0.5 arc-seconds minus a hair: rounding would give 5000
        let value = (0.5 - 1e-6) / 3600.0;
        let gps = to_gps_rational(value, 0.0);
        assert_eq!(gps.latitude.seconds.0, 4999);
    }

    #[test]
    fn garbage_input_does_not_panic() {
        for &(lat, lon) in &[
            (f64::NAN, f64::INFINITY),
            (f64::NEG_INFINITY, 1e300),
            (400.0, -1000.0),
        ] {
            let gps = to_gps_rational(lat, lon);
            assert!(gps.latitude.minutes.0 < 60 && gps.longitude.minutes.0 < 60);
        }
    }

    #[test]
    fn section_holds_the_five_tags() {
        let section = to_gps_rational(-33.8688, 151.2093).to_section();
        assert_eq!(section.len(), 5);
        assert_eq!(
            section.get(tag::GPS_VERSION_ID),
            Some(&TagValue::Byte(vec![2, 0, 0, 0]))
        );
        assert_eq!(
            section.get(tag::GPS_LATITUDE_REF).and_then(TagValue::as_ascii),
            Some("S")
        );
        assert_eq!(
            section.get(tag::GPS_LONGITUDE_REF).and_then(TagValue::as_ascii),
            Some("E")
        );
        match section.get(tag::GPS_LATITUDE) {
            Some(TagValue::Rational(parts)) => assert_eq!(parts[0], (33, 1)),
            other => panic!("unexpected latitude value {other:?}"),
        }
    }

    #[test]
    fn validation_bounds() {
        assert!(GeoCoordinate::new(90.0, -180.0).validate().is_ok());
        assert!(GeoCoordinate::new(90.1, 0.0).validate().is_err());
        assert!(GeoCoordinate::new(0.0, 180.5).validate().is_err());
        assert!(GeoCoordinate::new(f64::NAN, 0.0).validate().is_err());
    }
}
