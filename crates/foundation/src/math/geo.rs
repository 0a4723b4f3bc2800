//! Geographic-to-globe projection.
//!
//! The globe is a sphere centred on the origin with +Y through the north pole.
//! Longitude is measured with its sign inverted (`theta = 180° - lon`) so that
//! the hemisphere facing the default camera on +Z shows east and west the way a
//! map reader expects. Every layer that places geometry on the globe goes
//! through [`project`] so outlines, fills and markers agree.

use serde::{Deserialize, Serialize};

use super::{Vec2, Vec3};

/// Rendering radius of the globe shell.
pub const GLOBE_RADIUS: f64 = 1.3;
/// Boundary outlines float just above the shell.
pub const OUTLINE_RADIUS: f64 = GLOBE_RADIUS + 0.002;
/// Landmass fills sit just under their outline.
pub const FILL_RADIUS: f64 = OUTLINE_RADIUS - 0.01;
/// Markers float above the outlines so they never depth-fight with them.
pub const MARKER_RADIUS: f64 = GLOBE_RADIUS + 0.02;

/// A latitude/longitude pair in degrees. No range validation is performed.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeographicPoint {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl GeographicPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn project(self, radius: f64) -> Vec3 {
        project(self.latitude, self.longitude, radius)
    }
}

/// Map `(lat, lon)` in degrees to a point on the sphere of the given radius.
///
/// `phi = (90 - lat)` is the polar angle from +Y, `theta = (180 - lon)` the
/// azimuth in the XZ plane. Out-of-range inputs still yield a point on the
/// sphere.
pub fn project(lat_deg: f64, lon_deg: f64, radius: f64) -> Vec3 {
    let angular = angular(lat_deg, lon_deg);
    from_angular(angular, radius)
}

/// Flattened angular parameterization of a geographic point:
/// `x` is the azimuth `theta`, `y` the polar angle `phi`, both in radians.
///
/// Planar triangulation of a ring happens in this space; [`from_angular`]
/// lifts the result back onto the sphere.
pub fn angular(lat_deg: f64, lon_deg: f64) -> Vec2 {
    Vec2::new((180.0 - lon_deg).to_radians(), (90.0 - lat_deg).to_radians())
}

pub fn from_angular(angular: Vec2, radius: f64) -> Vec3 {
    let (theta, phi) = (angular.x, angular.y);
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vec3::new(
        radius * sin_phi * cos_theta,
        radius * cos_phi,
        radius * sin_phi * sin_theta,
    )
}

#[cfg(test)]
mod tests {
    use super::{
        FILL_RADIUS, GLOBE_RADIUS, GeographicPoint, MARKER_RADIUS, OUTLINE_RADIUS, angular,
        from_angular, project,
    };
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn prime_meridian_on_equator_faces_negative_x() {
        let p = project(0.0, 0.0, 2.0);
        assert_abs_diff_eq!(p.x, -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn east_longitude_maps_to_positive_z() {
        // theta = 180 - 90 = 90 degrees.
        let p = project(0.0, 90.0, 1.0);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.z, 1.0, epsilon = 1e-12);

        let w = project(0.0, -90.0, 1.0);
        assert_abs_diff_eq!(w.z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn poles_sit_on_the_y_axis() {
        let n = project(90.0, 123.0, 1.3);
        assert_abs_diff_eq!(n.y, 1.3, epsilon = 1e-12);
        assert_abs_diff_eq!(n.x, 0.0, epsilon = 1e-12);
        let s = project(-90.0, -45.0, 1.3);
        assert_abs_diff_eq!(s.y, -1.3, epsilon = 1e-12);
    }

    #[test]
    fn antimeridian_wraps_to_same_point() {
        let a = project(12.5, 180.0, 1.0);
        let b = project(12.5, -180.0, 1.0);
        assert!(a.distance(b) < 1e-12);
    }

    #[test]
    fn layer_radii_are_ordered() {
        assert!(FILL_RADIUS < OUTLINE_RADIUS);
        assert!(GLOBE_RADIUS < OUTLINE_RADIUS);
        assert!(OUTLINE_RADIUS < MARKER_RADIUS);
    }

    #[test]
    fn angular_round_trips_through_projection() {
        let uv = angular(-33.9, 151.2);
        let via_uv = from_angular(uv, 1.5);
        let direct = GeographicPoint::new(-33.9, 151.2).project(1.5);
        assert!(via_uv.distance(direct) < 1e-12);
    }

    #[test]
    fn deserializes_original_field_names() {
        let p: GeographicPoint = serde_json::from_str(r#"{"lat": 52.37, "lon": 4.9}"#)
            .expect("parse point");
        assert_eq!(p, GeographicPoint::new(52.37, 4.9));
    }

    proptest! {
        #[test]
        fn projected_points_lie_on_the_sphere(
            lat in -90.0f64..=90.0,
            lon in -180.0f64..=180.0,
            radius in 0.1f64..10.0,
        ) {
            let p = project(lat, lon, radius);
            prop_assert!((p.length() - radius).abs() < 1e-9 * radius.max(1.0));
        }

        #[test]
        fn out_of_range_inputs_still_lie_on_the_sphere(
            lat in -1000.0f64..1000.0,
            lon in -1000.0f64..1000.0,
        ) {
            let p = project(lat, lon, GLOBE_RADIUS);
            prop_assert!((p.length() - GLOBE_RADIUS).abs() < 1e-9);
        }

        #[test]
        fn small_perturbations_move_points_a_little(
            lat in -89.0f64..89.0,
            lon in -179.0f64..179.0,
            dlat in -1e-3f64..1e-3,
            dlon in -1e-3f64..1e-3,
        ) {
            let a = project(lat, lon, GLOBE_RADIUS);
            let b = project(lat + dlat, lon + dlon, GLOBE_RADIUS);
            // Chord length never exceeds the angular distance travelled.
            let bound = GLOBE_RADIUS * (dlat.abs() + dlon.abs()).to_radians();
            prop_assert!(a.distance(b) <= bound * (1.0 + 1e-6) + 1e-12);
        }
    }
}
