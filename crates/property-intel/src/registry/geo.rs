use serde::{Deserialize, Serialize};

use crate::domain::{check_range, ValidationError};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// WGS84 coordinate pair with bounds already checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        check_range("latitude", latitude, -90.0, 90.0)?;
        check_range("longitude", longitude, -180.0, 180.0)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Haversine distance in meters.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        // Rounding can push `a` past 1 for antipodal points.
        let a = ((d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2))
        .clamp(0.0, 1.0);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_METERS * c
    }

    /// `[longitude, latitude]`, the axis order used by the spatial index.
    pub(crate) fn as_xy(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Axis-aligned search window in degrees. Always a superset of the circle it
/// was derived from; callers filter candidates by exact distance afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, radius_meters: f64) -> Self {
        let angular = (radius_meters / EARTH_RADIUS_METERS).to_degrees();
        let min_latitude = (center.latitude - angular).max(-90.0);
        let max_latitude = (center.latitude + angular).min(90.0);

        let touches_pole = min_latitude <= -90.0 || max_latitude >= 90.0;
        let ratio = angular.to_radians().sin() / center.latitude.to_radians().cos();
        let (min_longitude, max_longitude) = if touches_pole || !(0.0..1.0).contains(&ratio) {
            (-180.0, 180.0)
        } else {
            let spread = ratio.asin().to_degrees();
            let west = center.longitude - spread;
            let east = center.longitude + spread;
            if west < -180.0 || east > 180.0 {
                // window wraps the antimeridian
                (-180.0, 180.0)
            } else {
                (west, east)
            }
        };

        Self {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }

    pub(crate) fn lower_xy(&self) -> [f64; 2] {
        [self.min_longitude, self.min_latitude]
    }

    pub(crate) fn upper_xy(&self) -> [f64; 2] {
        [self.max_longitude, self.max_latitude]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(matches!(
            GeoPoint::new(200.0, 0.0),
            Err(ValidationError::OutOfRange {
                field: "latitude",
                ..
            })
        ));
        assert!(matches!(
            GeoPoint::new(0.0, -180.5),
            Err(ValidationError::OutOfRange {
                field: "longitude",
                ..
            })
        ));
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let a = GeoPoint::new(41.0, -93.0).expect("valid");
        let b = GeoPoint::new(42.0, -93.0).expect("valid");
        let distance = a.distance_meters(&b);
        assert!((distance - 111_195.0).abs() < 100.0, "got {distance}");
    }

    #[test]
    fn antipodal_points_are_half_the_circumference_apart() {
        let half_turn = std::f64::consts::PI * EARTH_RADIUS_METERS;
        for (a, b) in [
            ((0.0, 0.0), (0.0, 180.0)),
            ((41.5868, -93.625), (-41.5868, 86.375)),
            ((90.0, 0.0), (-90.0, 0.0)),
        ] {
            let a = GeoPoint::new(a.0, a.1).expect("valid");
            let b = GeoPoint::new(b.0, b.1).expect("valid");
            let distance = a.distance_meters(&b);
            assert!(!distance.is_nan(), "{a:?} to {b:?}");
            assert!((distance - half_turn).abs() < 1.0, "got {distance}");
        }
    }

    #[test]
    fn bounding_box_widens_to_full_longitude_across_antimeridian() {
        let center = GeoPoint::new(10.0, 179.99).expect("valid");
        let window = BoundingBox::around(center, 5_000.0);
        assert_eq!(window.min_longitude, -180.0);
        assert_eq!(window.max_longitude, 180.0);
    }

    #[test]
    fn bounding_box_contains_the_search_circle() {
        let center = GeoPoint::new(41.5868, -93.625).expect("valid");
        let window = BoundingBox::around(center, 2_000.0);
        let north = GeoPoint::new(41.5868 + 0.017, -93.625).expect("valid");
        assert!(center.distance_meters(&north) < 2_000.0);
        assert!(north.latitude <= window.max_latitude);
        assert!(window.min_longitude < center.longitude && center.longitude < window.max_longitude);
    }
}
