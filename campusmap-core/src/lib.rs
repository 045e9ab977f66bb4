use anyhow::{Context, Result};
use std::time::Duration;

// Internal modules (private)
mod api;
mod controller;
mod error;
mod location;
mod overlay;

pub mod geo;
pub mod polyline;

// Re-export public types
pub use api::{LocationSource, LocationsClient};
pub use controller::{LoadState, LocationOverlayController};
pub use error::{FetchError, ValidationError};
pub use geo::{LatLng, Viewport};
pub use location::{parse_locations, Location, LocationId, LocationLoad};
pub use overlay::{InfoContent, InfoWindow, MarkerEntry, Region, RegionStyle, Rgb};

/// Environment variable overriding [`OverlayConfig::api_root`]
pub const ENV_API_ROOT: &str = "CAMPUSMAP_API_ROOT";
/// Environment variable overriding [`OverlayConfig::user_id`]
pub const ENV_USER_ID: &str = "CAMPUSMAP_USER_ID";
/// Environment variable overriding [`OverlayConfig::tile_url`]
pub const ENV_TILE_URL: &str = "CAMPUSMAP_TILE_URL";

/// OpenStreetMap raster tiles
pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Configuration options for the location overlay
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Base URL of the JSON API, e.g. `https://calendar.example.org/api`
    pub api_root: String,
    /// Viewer whose locations are shown. None shows every location.
    pub user_id: Option<u64>,
    /// Map center before anything is selected
    pub initial_center: LatLng,
    pub initial_zoom: f64,
    /// Zoom level applied when a marker is selected
    pub focus_zoom: f64,
    pub request_timeout: Duration,
    pub region_style: RegionStyle,
    /// Map tile URL pattern with `{z}`, `{x}` and `{y}` placeholders
    pub tile_url: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            api_root: "http://localhost:5000/api".to_string(),
            user_id: None,
            initial_center: LatLng::new(45.435, 12.335), // Venice
            initial_zoom: 14.0,
            focus_zoom: 18.0,
            request_timeout: Duration::from_secs(10),
            region_style: RegionStyle::default(),
            tile_url: OSM_TILE_URL.to_string(),
        }
    }
}

impl OverlayConfig {
    /// Defaults overlaid with `CAMPUSMAP_API_ROOT`, `CAMPUSMAP_USER_ID` and
    /// `CAMPUSMAP_TILE_URL`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(root) = lookup(ENV_API_ROOT).filter(|v| !v.trim().is_empty()) {
            config.api_root = root.trim().to_string();
        }

        if let Some(user) = lookup(ENV_USER_ID).filter(|v| !v.trim().is_empty()) {
            let user_id = user
                .trim()
                .parse()
                .with_context(|| format!("{} must be a user number, got {:?}", ENV_USER_ID, user))?;
            config.user_id = Some(user_id);
        }

        if let Some(tiles) = lookup(ENV_TILE_URL).filter(|v| !v.trim().is_empty()) {
            config.tile_url = tiles.trim().to_string();
        }

        Ok(config)
    }

    /// Endpoint selected by the viewer identity
    pub fn source(&self) -> LocationSource {
        match self.user_id {
            Some(user_id) => LocationSource::User(user_id),
            None => LocationSource::All,
        }
    }
}
