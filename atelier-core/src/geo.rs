use serde::{Deserialize, Serialize};

use crate::error::Error;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Result<Self, Error> {
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(Error::invalid(format!("longitude {} out of range", lng)));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::invalid(format!("latitude {} out of range", lat)));
        }
        Ok(Self { lng, lat })
    }

    /// Great-circle distance via the haversine formula.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(GeoPoint::new(181.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -91.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(-73.98, 40.75).is_ok());
    }

    #[test]
    fn distance_is_symmetric_and_plausible() {
        // Manhattan to Newark, roughly 14 km.
        let a = GeoPoint::new(-73.9857, 40.7484).unwrap();
        let b = GeoPoint::new(-74.1745, 40.7357).unwrap();
        let d = a.distance_km(&b);
        assert!((d - 15.9).abs() < 1.5, "got {}", d);
        assert!((a.distance_km(&b) - b.distance_km(&a)).abs() < 1e-9);
        assert_eq!(a.distance_km(&a), 0.0);
    }
}
