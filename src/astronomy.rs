//! Astronomical coordinate transforms
//!
//! Pure functions: wall-clock time + longitude -> local sidereal time, and
//! equatorial (RA/Dec) -> horizontal (azimuth/altitude) for a fixed observer.
//! Azimuth is measured from north, increasing eastward.

use std::f64::consts::{FRAC_PI_2, TAU};

use chrono::{DateTime, Utc};

/// Julian date of the Unix epoch (1970-01-01T00:00:00Z)
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// Julian date of J2000.0
const J2000_JD: f64 = 2_451_545.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;
const DAYS_PER_CENTURY: f64 = 36_525.0;

// Greenwich mean sidereal time polynomial (degrees)
const GMST_CONSTANT_DEG: f64 = 280.460_618_37;
const GMST_RATE_DEG_PER_DAY: f64 = 360.985_647_366_29;
const GMST_QUADRATIC_DEG: f64 = 0.000_387_933;

/// Length of one sidereal day in seconds
pub const SIDEREAL_DAY_SECONDS: f64 = 86_164.090_5;

/// Fixed terrestrial observer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl Observer {
    pub fn latitude_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }
}

/// The supported deployment location (central Tokyo)
pub const OBSERVER: Observer = Observer {
    latitude_deg: 35.6762,
    longitude_deg: 139.6503,
};

/// Horizontal coordinates in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizontal {
    /// [0, 2π), 0 = north, increasing eastward
    pub azimuth: f64,
    /// [-π/2, π/2]
    pub altitude: f64,
}

/// Wrap an angle into [0, 2π).
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Julian date for a Unix timestamp in milliseconds.
pub fn julian_date_from_unix_ms(unix_ms: f64) -> f64 {
    unix_ms / MILLIS_PER_DAY + UNIX_EPOCH_JD
}

/// Local sidereal time (radians, [0, 2π)) for a Unix timestamp in milliseconds.
pub fn local_sidereal_time_ms(unix_ms: f64, longitude_deg: f64) -> f64 {
    let days = julian_date_from_unix_ms(unix_ms) - J2000_JD;
    let centuries = days / DAYS_PER_CENTURY;

    let gmst_deg = GMST_CONSTANT_DEG
        + GMST_RATE_DEG_PER_DAY * days
        + GMST_QUADRATIC_DEG * centuries * centuries;
    let gmst_deg = gmst_deg.rem_euclid(360.0);

    normalize_angle((gmst_deg + longitude_deg).to_radians())
}

/// Local sidereal time (radians, [0, 2π)) at `time` for an observer at `longitude_deg`.
pub fn local_sidereal_time(time: DateTime<Utc>, longitude_deg: f64) -> f64 {
    local_sidereal_time_ms(time.timestamp_millis() as f64, longitude_deg)
}

/// Convert equatorial coordinates to horizontal coordinates.
///
/// All angles in radians. Azimuth comes from `atan2`, so it stays well defined
/// on the meridian and degrades to an arbitrary finite value at the zenith.
pub fn equatorial_to_horizontal(ra: f64, dec: f64, latitude: f64, lst: f64) -> Horizontal {
    let hour_angle = lst - ra;
    let (sin_dec, cos_dec) = dec.sin_cos();
    let (sin_lat, cos_lat) = latitude.sin_cos();
    let (sin_ha, cos_ha) = hour_angle.sin_cos();

    let sin_alt = sin_dec * sin_lat + cos_dec * cos_lat * cos_ha;
    let altitude = sin_alt.clamp(-1.0, 1.0).asin();

    let y = -cos_dec * sin_ha;
    let x = sin_dec * cos_lat - cos_dec * sin_lat * cos_ha;
    let azimuth = normalize_angle(y.atan2(x));

    Horizontal { azimuth, altitude }
}

/// Sixteen-point compass labels, clockwise from north
pub const COMPASS_LABELS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Compass label for an azimuth in radians (nearest 22.5° sector).
pub fn direction_name(azimuth: f64) -> &'static str {
    let sector = (azimuth.to_degrees() / 22.5).round();
    // `as` saturates (NaN -> 0), rem_euclid folds 360° back onto north
    let index = (sector as i64).rem_euclid(COMPASS_LABELS.len() as i64) as usize;
    COMPASS_LABELS[index]
}

/// Whether an altitude is above the drawing horizon.
///
/// Objects exactly on the horizon are not drawn.
pub fn is_above_horizon(altitude: f64) -> bool {
    altitude > 0.0
}

/// Clamp an altitude just short of the poles.
pub fn clamp_altitude(altitude: f64, margin: f64) -> f64 {
    altitude.clamp(-FRAC_PI_2 + margin, FRAC_PI_2 - margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use std::f64::consts::PI;

    fn angular_difference(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(TAU);
        d.min(TAU - d)
    }

    #[test]
    fn test_julian_date_j2000() {
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let jd = julian_date_from_unix_ms(j2000.timestamp_millis() as f64);
        assert_abs_diff_eq!(jd, J2000_JD, epsilon = 1e-9);
    }

    #[test]
    fn test_gmst_at_j2000() {
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let gmst = local_sidereal_time(j2000, 0.0);
        assert_abs_diff_eq!(gmst, GMST_CONSTANT_DEG.to_radians(), epsilon = 1e-9);
    }

    #[test]
    fn test_sidereal_time_periodicity() {
        let starts = [
            Utc.with_ymd_and_hms(2024, 3, 20, 3, 6, 0).unwrap(),
            Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2031, 7, 4, 18, 30, 0).unwrap(),
        ];
        for start in starts {
            let ms = start.timestamp_millis() as f64;
            let a = local_sidereal_time_ms(ms, OBSERVER.longitude_deg);
            let b = local_sidereal_time_ms(ms + SIDEREAL_DAY_SECONDS * 1000.0, OBSERVER.longitude_deg);
            assert!(
                angular_difference(a, b) < 1e-4,
                "LST drifted by {} rad over one sidereal day",
                angular_difference(a, b)
            );
        }
    }

    #[test]
    fn test_sidereal_time_in_range() {
        for longitude in [-180.0, -75.5, 0.0, 139.65, 180.0, 359.0] {
            let lst = local_sidereal_time_ms(1.7e12, longitude);
            assert!((0.0..TAU).contains(&lst));
        }
    }

    #[test]
    fn test_longitude_shifts_lst() {
        let ms = 1.7e12;
        let greenwich = local_sidereal_time_ms(ms, 0.0);
        let east = local_sidereal_time_ms(ms, 90.0);
        assert_abs_diff_eq!(
            angular_difference(east, greenwich),
            FRAC_PI_2,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_zenith_object() {
        let lat = OBSERVER.latitude_rad();
        let lst = 1.234;
        // dec == latitude, hour angle 0
        let h = equatorial_to_horizontal(lst, lat, lat, lst);
        assert_abs_diff_eq!(h.altitude, FRAC_PI_2, epsilon = 1e-6);
        assert!(h.azimuth.is_finite());
        assert!((0.0..TAU).contains(&h.azimuth));
    }

    #[test]
    fn test_meridian_transit_is_south_for_northern_observer() {
        let lat = OBSERVER.latitude_rad();
        let lst = 2.0;
        // Celestial equator on the meridian culminates due south
        let h = equatorial_to_horizontal(lst, 0.0, lat, lst);
        assert_abs_diff_eq!(h.azimuth, PI, epsilon = 1e-9);
        assert_abs_diff_eq!(h.altitude, FRAC_PI_2 - lat, epsilon = 1e-9);
    }

    #[test]
    fn test_rising_object_is_east() {
        // Equatorial object six hours before transit, observer on the equator
        let h = equatorial_to_horizontal(0.0, 0.0, 0.0, -FRAC_PI_2);
        assert_abs_diff_eq!(h.azimuth, FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(h.altitude, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_azimuth_always_normalized() {
        let lat = OBSERVER.latitude_rad();
        let mut ra = -7.0;
        while ra < 7.0 {
            let mut dec = -FRAC_PI_2;
            while dec <= FRAC_PI_2 {
                let h = equatorial_to_horizontal(ra, dec, lat, 0.37);
                assert!(
                    (0.0..TAU).contains(&h.azimuth),
                    "azimuth {} out of range for ra={ra} dec={dec}",
                    h.azimuth
                );
                assert!(h.altitude.abs() <= FRAC_PI_2);
                dec += 0.13;
            }
            ra += 0.29;
        }
    }

    #[test]
    fn test_normalize_angle_tiny_negative() {
        let a = normalize_angle(-1e-18);
        assert!(a < TAU);
        assert!(a >= 0.0);
    }

    #[test]
    fn test_direction_names() {
        assert_eq!(direction_name(0.0), "N");
        assert_eq!(direction_name(FRAC_PI_2), "E");
        assert_eq!(direction_name(PI), "S");
        assert_eq!(direction_name(3.0 * FRAC_PI_2), "W");
        assert_eq!(direction_name(45f64.to_radians()), "NE");
        // 355° rounds to the 360° sector, which wraps to north
        assert_eq!(direction_name(355f64.to_radians()), "N");
        assert_eq!(direction_name(TAU), "N");
        assert_eq!(direction_name(-FRAC_PI_2), "W");
    }

    #[test]
    fn test_direction_name_never_out_of_table() {
        for value in [
            f64::NAN,
            f64::INFINITY,
            f64::NEG_INFINITY,
            1e300,
            -1e300,
            123_456.789,
        ] {
            let name = direction_name(value);
            assert!(COMPASS_LABELS.contains(&name));
        }
    }

    #[test]
    fn test_horizon_cutoff() {
        assert!(!is_above_horizon(0.0));
        assert!(!is_above_horizon(-0.01));
        assert!(is_above_horizon(0.01));
    }
}
