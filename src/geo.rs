//! # Coordinate Transforms
//!
//! Pure conversions between the ECEF frame the receiver reports in and the
//! geodetic / local-NED representations the rest of the flight stack
//! consumes. WGS-84 ellipsoid throughout; angles are in radians.

use tracing::warn;

/// WGS-84 semi-major axis in meters
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS-84 flattening
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Height convergence threshold for the geodetic iteration, meters
const HEIGHT_TOLERANCE: f64 = 1e-6;

/// Iteration cap; the fixed point converges within a handful of rounds for
/// any physically valid ECEF input, so hitting this means the input was
/// pathological
const MAX_ITERATIONS: usize = 64;

/// Squared first eccentricity, e² = f(2 − f)
fn eccentricity_squared() -> f64 {
    WGS84_FLATTENING * (2.0 - WGS84_FLATTENING)
}

/// Convert an ECEF position to geodetic latitude, longitude, and height
///
/// Fixed-point iteration over the height estimate (Farrell's formulation):
/// starting from height 0, alternate updates of the latitude and the radius
/// of curvature until the height estimate moves less than a micrometer.
///
/// If the iteration cap is hit the last estimate is returned and a warning
/// is emitted; only termination is guaranteed for pathological input.
///
/// # Arguments
///
/// * `ecef` - ECEF position in meters
///
/// # Returns
///
/// * `[f64; 3]` - latitude (rad), longitude (rad), height above the
///   ellipsoid (m)
pub fn ecef_to_llh(ecef: [f64; 3]) -> [f64; 3] {
    let a = WGS84_SEMI_MAJOR_AXIS;
    let e2 = eccentricity_squared();

    let p = (ecef[0] * ecef[0] + ecef[1] * ecef[1]).sqrt();

    let mut radius = a;
    let mut height = 0.0_f64;
    let mut latitude = 0.0_f64;
    let mut converged = false;

    for _ in 0..MAX_ITERATIONS {
        let prev_height = height;
        let sin_lat = ecef[2] / ((1.0 - e2) * radius + height);
        latitude = ((ecef[2] + e2 * radius * sin_lat) / p).atan();
        radius = a / (1.0 - e2 * latitude.sin().powi(2)).sqrt();
        height = p / latitude.cos() - radius;

        if (height - prev_height).abs() <= HEIGHT_TOLERANCE {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            x = ecef[0],
            y = ecef[1],
            z = ecef[2],
            "geodetic conversion did not converge, returning last estimate"
        );
    }

    [latitude, ecef[1].atan2(ecef[0]), height]
}

/// Convert a geodetic position to ECEF
///
/// Inverse of [`ecef_to_llh`]; closed form, no iteration.
///
/// # Arguments
///
/// * `llh` - latitude (rad), longitude (rad), height above the ellipsoid (m)
///
/// # Returns
///
/// * `[f64; 3]` - ECEF position in meters
pub fn llh_to_ecef(llh: [f64; 3]) -> [f64; 3] {
    let a = WGS84_SEMI_MAJOR_AXIS;
    let e2 = eccentricity_squared();

    let (sin_lat, cos_lat) = llh[0].sin_cos();
    let (sin_lon, cos_lon) = llh[1].sin_cos();
    let radius = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    [
        (radius + llh[2]) * cos_lat * cos_lon,
        (radius + llh[2]) * cos_lat * sin_lon,
        (radius * (1.0 - e2) + llh[2]) * sin_lat,
    ]
}

/// Rotate an ECEF-frame vector into the local North-East-Down frame
///
/// # Arguments
///
/// * `v` - Vector expressed in ECEF axes
/// * `latitude` - Geodetic latitude of the local origin, radians
/// * `longitude` - Longitude of the local origin, radians
///
/// # Returns
///
/// * `[f64; 3]` - The same vector expressed in NED axes
pub fn ecef_vector_to_ned(v: [f64; 3], latitude: f64, longitude: f64) -> [f64; 3] {
    let (sin_lat, cos_lat) = latitude.sin_cos();
    let (sin_lon, cos_lon) = longitude.sin_cos();

    [
        -sin_lat * cos_lon * v[0] - sin_lat * sin_lon * v[1] + cos_lat * v[2],
        -sin_lon * v[0] + cos_lon * v[1],
        -cos_lat * cos_lon * v[0] - cos_lat * sin_lon * v[1] - sin_lat * v[2],
    ]
}

/// [`ecef_vector_to_ned`] for single-precision vectors (error sigmas are
/// f32 on the wire)
pub fn ecef_vector_to_ned_f32(v: [f32; 3], latitude: f64, longitude: f64) -> [f32; 3] {
    let ned = ecef_vector_to_ned(
        [v[0] as f64, v[1] as f64, v[2] as f64],
        latitude,
        longitude,
    );
    [ned[0] as f32, ned[1] as f32, ned[2] as f32]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const RAD: f64 = std::f64::consts::PI / 180.0;

    fn assert_close(actual: f64, expected: f64, tolerance: f64, what: &str) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "{}: {} not within {} of {}",
            what,
            actual,
            tolerance,
            expected
        );
    }

    #[test]
    fn test_equator_prime_meridian() {
        let llh = ecef_to_llh([WGS84_SEMI_MAJOR_AXIS, 0.0, 0.0]);
        assert_close(llh[0], 0.0, 1e-9, "latitude");
        assert_close(llh[1], 0.0, 1e-9, "longitude");
        assert_close(llh[2], 0.0, 1e-6, "height");
    }

    #[test]
    fn test_llh_ecef_round_trip() {
        let points = [
            [45.0 * RAD, 7.0 * RAD, 500.0],
            [-33.86 * RAD, 151.21 * RAD, 25.0],
            [53.5 * RAD, -113.5 * RAD, 670.0],
            [0.1 * RAD, 179.9 * RAD, 10_000.0],
            [-80.0 * RAD, -45.0 * RAD, 0.0],
        ];

        for llh in points {
            let round_trip = ecef_to_llh(llh_to_ecef(llh));
            assert_close(round_trip[0], llh[0], 1e-9, "latitude");
            assert_close(round_trip[1], llh[1], 1e-9, "longitude");
            assert_close(round_trip[2], llh[2], 1e-6, "height");
        }
    }

    #[test]
    fn test_ecef_to_llh_terminates_on_pathological_input() {
        // Not a point any receiver can report; only termination matters.
        let _ = ecef_to_llh([1.0, 1.0, 1e12]);
    }

    #[test]
    fn test_ned_axes_at_equator() {
        // At lat 0, lon 0: ECEF +x is radially out (up, i.e. -down),
        // +y is east, +z is north.
        let ned = ecef_vector_to_ned([1.0, 0.0, 0.0], 0.0, 0.0);
        assert_close(ned[0], 0.0, 1e-12, "north");
        assert_close(ned[1], 0.0, 1e-12, "east");
        assert_close(ned[2], -1.0, 1e-12, "down");

        let ned = ecef_vector_to_ned([0.0, 1.0, 0.0], 0.0, 0.0);
        assert_close(ned[1], 1.0, 1e-12, "east");

        let ned = ecef_vector_to_ned([0.0, 0.0, 1.0], 0.0, 0.0);
        assert_close(ned[0], 1.0, 1e-12, "north");
    }

    #[test]
    fn test_ned_axes_at_pole() {
        // At the north pole ECEF +z points up, so down is -z.
        let ned = ecef_vector_to_ned([0.0, 0.0, 1.0], FRAC_PI_2, 0.0);
        assert_close(ned[2], -1.0, 1e-12, "down");
    }

    #[test]
    fn test_ned_rotation_preserves_length() {
        let v = [3.0, -4.0, 12.0];
        let ned = ecef_vector_to_ned(v, 0.7, -2.1);
        let len_in = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        let len_out = (ned[0] * ned[0] + ned[1] * ned[1] + ned[2] * ned[2]).sqrt();
        assert_close(len_out, len_in, 1e-9, "vector length");
    }
}
