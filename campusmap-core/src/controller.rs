use crate::api::LocationsClient;
use crate::error::{FetchError, ValidationError};
use crate::geo::{LatLng, Viewport};
use crate::location::{LocationId, LocationLoad};
use crate::overlay::{MarkerEntry, Region};
use crate::OverlayConfig;
use std::collections::HashMap;

/// Progress of the location load, for status and error display
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded { markers: usize, rejected: usize },
    Failed(String),
}

/// Owns the markers of one map view and the single highlighted selection.
///
/// At most one region is visible and at most one info window is open at any
/// time, and both belong to the current selection.
#[derive(Debug)]
pub struct LocationOverlayController {
    config: OverlayConfig,
    /// Entries in payload order
    entries: Vec<MarkerEntry>,
    index: HashMap<LocationId, usize>,
    rejected: Vec<ValidationError>,
    current: Option<LocationId>,
    viewport: Viewport,
    state: LoadState,
}

impl LocationOverlayController {
    pub fn new(config: OverlayConfig) -> Self {
        let viewport = Viewport::new(config.initial_center, config.initial_zoom);
        Self {
            config,
            entries: Vec::new(),
            index: HashMap::new(),
            rejected: Vec::new(),
            current: None,
            viewport,
            state: LoadState::Idle,
        }
    }

    /// Fetch the locations and create one marker per valid record.
    /// Returns the number of markers created.
    pub async fn initialize(&mut self, client: &LocationsClient) -> Result<usize, FetchError> {
        self.begin_load();
        let result = client.fetch_locations().await;
        self.finish_load(result)
    }

    /// Mark a load as in flight. Use with [`finish_load`](Self::finish_load)
    /// when the fetch runs elsewhere.
    pub fn begin_load(&mut self) {
        self.state = LoadState::Loading;
    }

    /// Apply the outcome of a fetch. On failure the previous markers are kept
    /// and the error is recorded for display.
    pub fn finish_load(
        &mut self,
        result: Result<LocationLoad, FetchError>,
    ) -> Result<usize, FetchError> {
        match result {
            Ok(load) => Ok(self.apply_load(load)),
            Err(e) => {
                log::error!("Failed to load locations: {}", e);
                self.state = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Record a load that could not even be started
    pub fn abort_load(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        log::error!("Location load aborted: {}", reason);
        self.state = LoadState::Failed(reason);
    }

    fn apply_load(&mut self, load: LocationLoad) -> usize {
        let style = self.config.region_style;

        self.current = None;
        self.entries = load
            .locations
            .iter()
            .map(|location| MarkerEntry::from_location(location, style))
            .collect();
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.id, i))
            .collect();
        self.rejected = load.rejected;

        let markers = self.entries.len();
        self.state = LoadState::Loaded {
            markers,
            rejected: self.rejected.len(),
        };

        log::info!(
            "Created {} markers ({} with outlines, {} records skipped)",
            markers,
            self.entries.iter().filter(|e| e.region.is_some()).count(),
            self.rejected.len()
        );

        markers
    }

    /// Highlight a marker: hide the previous selection, show this one and
    /// zoom in on it. Selecting the current marker again just re-centers.
    pub fn select_marker(&mut self, id: LocationId) -> bool {
        let Some(&target) = self.index.get(&id) else {
            log::warn!("Ignoring selection of unknown location {}", id);
            return false;
        };

        if let Some(previous) = self.current.and_then(|cur| self.index.get(&cur).copied()) {
            self.entries[previous].conceal();
        }

        let entry = &mut self.entries[target];
        entry.reveal();

        let position = entry.position;
        self.viewport.set_center(position);
        self.viewport.set_zoom(self.config.focus_zoom);
        self.current = Some(id);

        log::debug!("Selected location {} at {}", id, position);
        true
    }

    /// Close the popup of the current marker. Its region stays visible.
    pub fn close_info_window(&mut self) {
        if let Some(i) = self.current.and_then(|cur| self.index.get(&cur).copied()) {
            self.entries[i].info.close();
        }
    }

    /// Marker closest to a screen point, if any lies within `tolerance`
    /// pixels. `project` maps a coordinate to the same screen space as `point`.
    pub fn pick_marker<F>(
        &self,
        point: (f64, f64),
        tolerance: f64,
        project: F,
    ) -> Option<LocationId>
    where
        F: Fn(LatLng) -> (f64, f64),
    {
        self.entries
            .iter()
            .map(|entry| {
                let (x, y) = project(entry.position);
                (entry.id, (x - point.0).hypot(y - point.1))
            })
            .filter(|(_, distance)| *distance <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn entries(&self) -> &[MarkerEntry] {
        &self.entries
    }

    pub fn entry(&self, id: LocationId) -> Option<&MarkerEntry> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn current(&self) -> Option<LocationId> {
        self.current
    }

    pub fn current_entry(&self) -> Option<&MarkerEntry> {
        self.current.and_then(|id| self.entry(id))
    }

    /// Regions currently shown on the map
    pub fn visible_regions(&self) -> impl Iterator<Item = (&MarkerEntry, &Region)> {
        self.entries.iter().filter_map(|entry| {
            entry
                .region
                .as_ref()
                .filter(|r| r.is_visible())
                .map(|r| (entry, r))
        })
    }

    /// Entries whose info window is open
    pub fn open_info_windows(&self) -> impl Iterator<Item = &MarkerEntry> {
        self.entries.iter().filter(|entry| entry.info.is_open())
    }

    pub fn rejected(&self) -> &[ValidationError] {
        &self.rejected
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }
}
