//! Geodetic distance model.
//!
//! Distances are computed on the WGS-84 ellipsoid with Vincenty's inverse
//! formula, not a flat-plane or plain spherical approximation. Near-antipodal
//! point pairs, where Vincenty's iteration does not converge, fall back to the
//! spherical haversine formula.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ─── Units ───────────────────────────────────────────────────────────────────

/// A unit for reporting proximity distances.
///
/// The serialised forms (`meters`, `km`, `miles`) are the wire values accepted
/// in requests and echoed back on each annotated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
  #[serde(rename = "meters")]
  Meters,
  #[serde(rename = "km")]
  Kilometers,
  #[serde(rename = "miles")]
  Miles,
}

impl DistanceUnit {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Meters => "meters",
      Self::Kilometers => "km",
      Self::Miles => "miles",
    }
  }

  /// Convert a distance in meters to this unit.
  pub fn from_meters(self, meters: f64) -> f64 {
    match self {
      Self::Meters => meters,
      Self::Kilometers => meters / 1000.0,
      Self::Miles => meters / METERS_PER_MILE,
    }
  }
}

impl fmt::Display for DistanceUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for DistanceUnit {
  type Err = Error;

  /// Unrecognised units are rejected rather than passed through unconverted.
  fn from_str(s: &str) -> Result<Self, Error> {
    match s {
      "meters" => Ok(Self::Meters),
      "km" => Ok(Self::Kilometers),
      "miles" => Ok(Self::Miles),
      other => Err(Error::InvalidInput(format!(
        "unknown distance unit {other:?} (expected meters, km, or miles)"
      ))),
    }
  }
}

// ─── WGS-84 constants ────────────────────────────────────────────────────────

/// Semi-major axis, meters.
const WGS84_A: f64 = 6_378_137.0;
/// Flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// Semi-minor axis, meters.
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

const METERS_PER_MILE: f64 = 1_609.344;

const CONVERGENCE: f64 = 1e-12;
const MAX_ITERATIONS: usize = 200;

// ─── Distance ────────────────────────────────────────────────────────────────

/// Geodesic distance in meters between two coordinates on the WGS-84
/// ellipsoid (Vincenty inverse).
pub fn geodesic_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
  // Reduced latitudes.
  let u1 = ((1.0 - WGS84_F) * lat1.to_radians().tan()).atan();
  let u2 = ((1.0 - WGS84_F) * lat2.to_radians().tan()).atan();
  let l = (lon2 - lon1).to_radians();

  let (sin_u1, cos_u1) = u1.sin_cos();
  let (sin_u2, cos_u2) = u2.sin_cos();

  let mut lambda = l;
  for _ in 0..MAX_ITERATIONS {
    let (sin_lambda, cos_lambda) = lambda.sin_cos();
    let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
      + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
    .sqrt();

    // Coincident points.
    if sin_sigma == 0.0 {
      return 0.0;
    }

    let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
    let sigma = sin_sigma.atan2(cos_sigma);
    let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
    let cos2_alpha = 1.0 - sin_alpha * sin_alpha;
    // Equatorial geodesics have cos²α = 0.
    let cos_2sigma_m = if cos2_alpha == 0.0 {
      0.0
    } else {
      cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
    };

    let c = WGS84_F / 16.0 * cos2_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos2_alpha));
    let prev = lambda;
    lambda = l
      + (1.0 - c)
        * WGS84_F
        * sin_alpha
        * (sigma
          + c * sin_sigma
            * (cos_2sigma_m
              + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

    if (lambda - prev).abs() < CONVERGENCE {
      let u_sq = cos2_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B)
        / (WGS84_B * WGS84_B);
      let a_coef = 1.0
        + u_sq / 16384.0
          * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
      let b_coef =
        u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
      let delta_sigma = b_coef
        * sin_sigma
        * (cos_2sigma_m
          + b_coef / 4.0
            * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
              - b_coef / 6.0
                * cos_2sigma_m
                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

      return WGS84_B * a_coef * (sigma - delta_sigma);
    }
  }

  // Near-antipodal: Vincenty did not converge.
  haversine_meters(lat1, lon1, lat2, lon2)
}

/// Great-circle distance on a sphere of mean earth radius, in meters.
fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
  const MEAN_RADIUS: f64 = 6_371_008.8;

  let d_lat = (lat2 - lat1).to_radians();
  let d_lon = (lon2 - lon1).to_radians();
  let a = (d_lat / 2.0).sin().powi(2)
    + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
  2.0 * MEAN_RADIUS * a.sqrt().asin()
}

/// Round to two decimal places, the precision reported to callers.
pub fn round2(x: f64) -> f64 {
  (x * 100.0).round() / 100.0
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn coincident_points_are_zero() {
    assert_eq!(geodesic_meters(34.0434, 71.6293, 34.0434, 71.6293), 0.0);
  }

  #[test]
  fn vincenty_reference_line() {
    // Flinders Peak to Buninyong, the worked example from Vincenty (1975):
    // 54 972.271 m.
    let d = geodesic_meters(
      -37.951_033_416_666_67,
      144.424_867_888_888_88,
      -37.652_821_138_888_89,
      143.926_495_527_777_78,
    );
    assert!((d - 54_972.271).abs() < 0.5, "got {d}");
  }

  #[test]
  fn one_degree_along_the_equator() {
    // The equator is a circle of radius a: 1° of longitude = a · π/180.
    let d = geodesic_meters(0.0, 0.0, 0.0, 1.0);
    assert!((d - 111_319.491).abs() < 0.5, "got {d}");
  }

  #[test]
  fn distance_is_symmetric() {
    let ab = geodesic_meters(34.0434, 71.6293, 34.10, 71.70);
    let ba = geodesic_meters(34.10, 71.70, 34.0434, 71.6293);
    assert!((ab - ba).abs() < 1e-6);
  }

  #[test]
  fn near_antipodal_falls_back_gracefully() {
    // Almost exactly opposite points; must return a finite, plausible value.
    let d = geodesic_meters(0.0, 0.0, 0.1, 179.95);
    assert!(d.is_finite());
    assert!(d > 19_000_000.0 && d < 20_100_000.0, "got {d}");
  }

  #[test]
  fn unit_conversion_is_consistent() {
    let meters = 5_000.0;
    assert_eq!(DistanceUnit::Meters.from_meters(meters), 5_000.0);
    assert_eq!(DistanceUnit::Kilometers.from_meters(meters), 5.0);
    let miles = DistanceUnit::Miles.from_meters(meters);
    assert!((miles - 5_000.0 / 1_609.344).abs() < 1e-9);
  }

  #[test]
  fn unit_parsing() {
    assert_eq!("meters".parse::<DistanceUnit>().unwrap(), DistanceUnit::Meters);
    assert_eq!("km".parse::<DistanceUnit>().unwrap(), DistanceUnit::Kilometers);
    assert_eq!("miles".parse::<DistanceUnit>().unwrap(), DistanceUnit::Miles);
    assert!(matches!(
      "furlongs".parse::<DistanceUnit>(),
      Err(Error::InvalidInput(_))
    ));
  }

  #[test]
  fn round2_rounds_half_up() {
    assert_eq!(round2(6.3349), 6.33);
    assert_eq!(round2(6.335), 6.34);
  }
}
