use bevy::math::{DVec3, Vec3};
use std::{
    f64::consts::PI,
    ops::{Add, Sub},
};

/// Mean earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Default, Debug, Clone, PartialEq, Copy)]
pub struct GeoCoord {
    pub lat: f64,
    pub long: f64,
}

impl GeoCoord {
    pub const fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    /// Builds a coordinate from a `geo` point, which keeps longitude in `x`.
    pub fn from_lon_lat(coord: geo::Coord<f64>) -> Self {
        Self::new(coord.y, coord.x)
    }

    pub fn to_lon_lat(&self) -> [f64; 2] {
        [self.long, self.lat]
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoCoord) -> f64 {
        let lat1 = deg_to_rad(self.lat);
        let lat2 = deg_to_rad(other.lat);
        let d_lat = lat2 - lat1;
        let d_lon = deg_to_rad(other.long - self.long);

        let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
            + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin() * (d_lon / 2.0).sin();
        let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// Maps the coordinate onto a sphere of `radius` centred at the origin.
    ///
    /// Y is up, latitude 0 / longitude 0 faces +Z and longitude 90 faces +X.
    pub fn to_cartesian(&self, radius: f64) -> DVec3 {
        let phi = deg_to_rad(90.0 - self.lat);
        let theta = deg_to_rad(90.0 - self.long);
        DVec3::new(
            radius * phi.sin() * theta.cos(),
            radius * phi.cos(),
            radius * phi.sin() * theta.sin(),
        )
    }

    pub fn to_render_space(&self, radius: f32) -> Vec3 {
        self.to_cartesian(radius as f64).as_vec3()
    }

    /// Inverse of [`GeoCoord::to_cartesian`]; the radius of `point` is ignored.
    pub fn from_cartesian(point: DVec3) -> Option<Self> {
        let r = point.length();
        if r <= f64::EPSILON {
            return None;
        }
        let phi = (point.y / r).clamp(-1.0, 1.0).acos();
        let theta = point.z.atan2(point.x);
        Some(Self::new(
            90.0 - rad_to_deg(phi),
            normalize_longitude(90.0 - rad_to_deg(theta)),
        ))
    }

    pub fn with_lat_offset(&self, offset: f64) -> Self {
        Self::new((self.lat + offset).clamp(-89.0, 89.0), self.long)
    }
}

impl Add for GeoCoord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        GeoCoord {
            lat: self.lat + rhs.lat,
            long: self.long + rhs.long,
        }
    }
}

impl Sub for GeoCoord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        GeoCoord {
            lat: self.lat - rhs.lat,
            long: self.long - rhs.long,
        }
    }
}

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

pub fn normalize_longitude(lon: f64) -> f64 {
    let mut lon = lon;
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

/// Nearest intersection of a ray with a sphere, if the sphere is in front of
/// the ray origin.
pub fn ray_sphere_intersection(
    origin: DVec3,
    direction: DVec3,
    center: DVec3,
    radius: f64,
) -> Option<DVec3> {
    let dir = direction.try_normalize()?;
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let near = -b - sqrt_d;
    let far = -b + sqrt_d;
    let t = if near >= 0.0 {
        near
    } else if far >= 0.0 {
        // Origin is inside the sphere.
        far
    } else {
        return None;
    };
    Some(origin + dir * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn distance_to_self_is_zero() {
        let berlin = GeoCoord::new(52.52, 13.405);
        assert_eq!(berlin.distance_km(&berlin), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let berlin = GeoCoord::new(52.52, 13.405);
        let madrid = GeoCoord::new(40.4168, -3.7038);
        assert_eq!(berlin.distance_km(&madrid), madrid.distance_km(&berlin));
        // Roughly 1870 km apart.
        let d = berlin.distance_km(&madrid);
        assert!((1850.0..1890.0).contains(&d), "got {d}");
    }

    #[test]
    fn antipodes_are_half_the_circumference() {
        let a = GeoCoord::new(0.0, 0.0);
        let b = GeoCoord::new(0.0, 180.0);
        let expected = PI * EARTH_RADIUS_KM;
        assert!((a.distance_km(&b) - expected).abs() < 1e-6);
    }

    #[test]
    fn degree_radian_conversion() {
        assert!((deg_to_rad(180.0) - PI).abs() < EPS);
        assert!((rad_to_deg(PI / 2.0) - 90.0).abs() < EPS);
    }

    #[test]
    fn cartesian_axes() {
        let front = GeoCoord::new(0.0, 0.0).to_cartesian(1.0);
        assert!((front - DVec3::Z).length() < EPS);

        let east = GeoCoord::new(0.0, 90.0).to_cartesian(1.0);
        assert!((east - DVec3::X).length() < EPS);

        let north = GeoCoord::new(90.0, 0.0).to_cartesian(2.0);
        assert!((north - DVec3::new(0.0, 2.0, 0.0)).length() < EPS);
    }

    #[test]
    fn cartesian_round_trip() {
        for coord in [
            GeoCoord::new(52.52, 13.405),
            GeoCoord::new(-33.86, 151.2),
            GeoCoord::new(40.71, -74.0),
            GeoCoord::new(-54.8, -68.3),
        ] {
            let back = GeoCoord::from_cartesian(coord.to_cartesian(100.0)).unwrap();
            assert!((back.lat - coord.lat).abs() < 1e-9, "{coord:?} -> {back:?}");
            assert!((back.long - coord.long).abs() < 1e-9, "{coord:?} -> {back:?}");
        }
    }

    #[test]
    fn from_cartesian_rejects_origin() {
        assert!(GeoCoord::from_cartesian(DVec3::ZERO).is_none());
    }

    #[test]
    fn ray_hits_near_side_of_sphere() {
        let hit = ray_sphere_intersection(
            DVec3::new(0.0, 0.0, 250.0),
            DVec3::new(0.0, 0.0, -1.0),
            DVec3::ZERO,
            100.0,
        )
        .unwrap();
        assert!((hit - DVec3::new(0.0, 0.0, 100.0)).length() < EPS);
    }

    #[test]
    fn ray_misses_sphere() {
        let hit = ray_sphere_intersection(
            DVec3::new(0.0, 150.0, 250.0),
            DVec3::new(0.0, 0.0, -1.0),
            DVec3::ZERO,
            100.0,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn sphere_behind_ray_is_ignored() {
        let hit = ray_sphere_intersection(
            DVec3::new(0.0, 0.0, 250.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::ZERO,
            100.0,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn longitude_wraps() {
        assert_eq!(normalize_longitude(190.0), -170.0);
        assert_eq!(normalize_longitude(-190.0), 170.0);
    }
}
