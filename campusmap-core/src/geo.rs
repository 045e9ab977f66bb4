use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Side length of a single map tile in pixels at zoom 0
pub const TILE_SIZE: f64 = 256.0;

/// Zoom limits for the viewport
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 20.0;

// Latitude limit of the Web Mercator projection
const MAX_LATITUDE: f64 = 85.05112878;

/// A WGS84 coordinate pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and inside the valid degree ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Project to Web Mercator world pixels at the given zoom level
    fn to_world(self, zoom: f64) -> (f64, f64) {
        let size = world_size(zoom);
        let lat = self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

        let x = (self.lng + 180.0) / 360.0 * size;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
        (x, y)
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Wrap a longitude into [-180, 180]. Non-finite input maps to 0.
fn normalize_longitude(lng: f64) -> f64 {
    if !lng.is_finite() {
        return 0.0;
    }
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

/// Visible part of the map: a center coordinate and a zoom level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    center: LatLng,
    zoom: f64,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: f64) -> Self {
        let mut viewport = Self {
            center: LatLng::new(0.0, 0.0),
            zoom: MIN_ZOOM,
        };
        viewport.set_center(center);
        viewport.set_zoom(zoom);
        viewport
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Move the center, clamping latitude to the projection limits.
    /// A NaN latitude leaves the center unchanged.
    pub fn set_center(&mut self, center: LatLng) {
        if center.lat.is_nan() {
            return;
        }
        self.center = LatLng::new(
            center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            normalize_longitude(center.lng),
        );
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if !zoom.is_nan() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Pixel offset of `point` from the viewport center (x right, y down)
    pub fn offset_of(&self, point: LatLng) -> (f64, f64) {
        let (cx, cy) = self.center.to_world(self.zoom);
        let (px, py) = point.to_world(self.zoom);
        (px - cx, py - cy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VENICE: LatLng = LatLng::new(45.435, 12.335);

    #[test]
    fn test_center_projects_to_origin() {
        let viewport = Viewport::new(VENICE, 14.0);
        let (dx, dy) = viewport.offset_of(VENICE);
        assert!(dx.abs() < 1e-9);
        assert!(dy.abs() < 1e-9);
    }

    #[test]
    fn test_offset_direction() {
        let viewport = Viewport::new(VENICE, 14.0);

        // North-east of the center is up and to the right on screen
        let (dx, dy) = viewport.offset_of(LatLng::new(45.44, 12.34));
        assert!(dx > 0.0);
        assert!(dy < 0.0);
    }

    #[test]
    fn test_offset_scales_with_zoom() {
        let near = LatLng::new(45.4312, 12.3265);
        let (dx14, dy14) = Viewport::new(VENICE, 14.0).offset_of(near);
        let (dx15, dy15) = Viewport::new(VENICE, 15.0).offset_of(near);
        assert!((dx15 - 2.0 * dx14).abs() < 1e-6);
        assert!((dy15 - 2.0 * dy14).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut viewport = Viewport::new(VENICE, 25.0);
        assert_eq!(viewport.zoom(), MAX_ZOOM);

        viewport.set_zoom(-3.0);
        assert_eq!(viewport.zoom(), MIN_ZOOM);

        viewport.set_zoom(15.0);
        viewport.set_zoom(f64::NAN);
        assert_eq!(viewport.zoom(), 15.0);
    }

    #[test]
    fn test_latlng_validity() {
        assert!(VENICE.is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
        assert!(!LatLng::new(0.0, 181.0).is_valid());
        assert!(!LatLng::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_center_is_normalized() {
        let viewport = Viewport::new(LatLng::new(89.0, 190.0), 3.0);
        assert!(viewport.center().lat <= MAX_LATITUDE);
        assert!((viewport.center().lng + 170.0).abs() < 1e-9);
    }

    #[test]
    fn test_longitude_wrapping() {
        assert_eq!(normalize_longitude(180.0), 180.0);
        assert_eq!(normalize_longitude(-180.0), -180.0);
        assert!((normalize_longitude(720.0 + 12.5) - 12.5).abs() < 1e-9);
        assert!((normalize_longitude(-190.0) - 170.0).abs() < 1e-9);
        assert_eq!(normalize_longitude(f64::INFINITY), 0.0);
        assert_eq!(normalize_longitude(f64::NEG_INFINITY), 0.0);
        assert_eq!(normalize_longitude(f64::NAN), 0.0);
    }

    #[test]
    fn test_non_finite_center() {
        let mut viewport = Viewport::new(VENICE, 14.0);
        viewport.set_center(LatLng::new(45.0, f64::INFINITY));
        assert_eq!(viewport.center(), LatLng::new(45.0, 0.0));

        viewport.set_center(LatLng::new(f64::NAN, 12.0));
        assert_eq!(viewport.center(), LatLng::new(45.0, 0.0));
    }
}
