use crate::models::address::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Fallback location used when a driver or address has no coordinates (Manhattan depot).
pub const DEFAULT_DEPOT: GeoPoint = GeoPoint {
    lat: 40.7128,
    lng: -74.0060,
};

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Linear interpolation between two points; `progress` is clamped to `[0, 1]`.
pub fn interpolate(start: &GeoPoint, end: &GeoPoint, progress: f64) -> GeoPoint {
    let t = if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    };

    GeoPoint {
        lat: start.lat + (end.lat - start.lat) * t,
        lng: start.lng + (end.lng - start.lng) * t,
    }
}

pub fn is_valid(point: &GeoPoint) -> bool {
    (-90.0..=90.0).contains(&point.lat) && (-180.0..=180.0).contains(&point.lng)
}

#[cfg(test)]
mod tests {
    use super::{haversine_km, interpolate, is_valid};
    use crate::models::address::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 40.7128,
            lng: -74.0060,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn manhattan_to_brooklyn_is_around_6_km() {
        let manhattan = GeoPoint {
            lat: 40.7128,
            lng: -74.0060,
        };
        let brooklyn = GeoPoint {
            lat: 40.6892,
            lng: -73.9442,
        };
        let distance = haversine_km(&manhattan, &brooklyn);
        assert!((distance - 5.8).abs() < 0.5);
    }

    #[test]
    fn interpolate_halfway_and_clamps() {
        let a = GeoPoint { lat: 0.0, lng: 0.0 };
        let b = GeoPoint {
            lat: 10.0,
            lng: 20.0,
        };

        let mid = interpolate(&a, &b, 0.5);
        assert!((mid.lat - 5.0).abs() < 1e-9);
        assert!((mid.lng - 10.0).abs() < 1e-9);

        assert_eq!(interpolate(&a, &b, 3.0), b);
        assert_eq!(interpolate(&a, &b, -1.0), a);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(is_valid(&GeoPoint {
            lat: 90.0,
            lng: -180.0
        }));
        assert!(!is_valid(&GeoPoint {
            lat: 91.0,
            lng: 0.0
        }));
        assert!(!is_valid(&GeoPoint {
            lat: 0.0,
            lng: 180.5
        }));
    }
}
