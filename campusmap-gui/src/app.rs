use crate::map::{from_position, to_position, MapEvents, OverlayPlugin, UrlTileSource, ATTRIBUTION};
use anyhow::{Context, Result};
use campusmap_core::{
    FetchError, LoadState, LocationLoad, LocationOverlayController, LocationsClient, OverlayConfig,
};
use eframe::egui;
use tokio::sync::oneshot;
use walkers::{HttpTiles, Map, MapMemory};

type PendingLoad = oneshot::Receiver<Result<LocationLoad, FetchError>>;

pub struct CampusMapApp {
    controller: LocationOverlayController,

    // Map widget state, mirroring the controller's viewport
    map_memory: MapMemory,
    tiles: HttpTiles,

    // Settings inputs
    api_root_input: String,
    user_id_input: String,
    settings_error: Option<String>,

    // Fetch running on the loader thread
    pending_load: Option<PendingLoad>,
}

impl CampusMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let (config, settings_error) = match OverlayConfig::from_env() {
            Ok(config) => (config, None),
            Err(e) => (OverlayConfig::default(), Some(format!("{:#}", e))),
        };

        let source = UrlTileSource::new(config.tile_url.clone());
        let tiles = HttpTiles::new(source, cc.egui_ctx.clone());
        let mut app = Self {
            api_root_input: config.api_root.clone(),
            user_id_input: config.user_id.map(|id| id.to_string()).unwrap_or_default(),
            controller: LocationOverlayController::new(config),
            map_memory: MapMemory::default(),
            tiles,
            settings_error,
            pending_load: None,
        };
        app.sync_map();

        if app.settings_error.is_none() {
            app.start_load();
        }
        app
    }

    fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    fn config_from_inputs(&self) -> Result<OverlayConfig> {
        let api_root = self.api_root_input.trim();
        if api_root.is_empty() {
            anyhow::bail!("API root must not be empty");
        }

        Ok(OverlayConfig {
            api_root: api_root.to_string(),
            user_id: parse_user_id(&self.user_id_input)?,
            ..self.controller.config().clone()
        })
    }

    fn start_load(&mut self) {
        let config = match self.config_from_inputs() {
            Ok(config) => config,
            Err(e) => {
                self.settings_error = Some(format!("{:#}", e));
                return;
            }
        };
        self.settings_error = None;

        let client = match LocationsClient::new(&config) {
            Ok(client) => client,
            Err(e) => {
                self.controller.abort_load(e.to_string());
                return;
            }
        };

        // A new endpoint means a new view
        if config.api_root != self.controller.config().api_root
            || config.user_id != self.controller.config().user_id
        {
            self.controller = LocationOverlayController::new(config);
            self.sync_map();
        }
        self.controller.begin_load();

        let (tx, rx) = oneshot::channel();
        self.pending_load = Some(rx);

        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    log::error!("Failed to start loader runtime: {}", e);
                    return;
                }
            };

            let result = runtime.block_on(client.fetch_locations());
            if tx.send(result).is_err() {
                log::debug!("Location load finished after the view went away");
            }
        });
    }

    fn check_load_complete(&mut self) {
        let Some(rx) = self.pending_load.as_mut() else {
            return;
        };

        match rx.try_recv() {
            Ok(result) => {
                self.pending_load = None;
                // The error is kept in the controller's load state for the banner
                let _ = self.controller.finish_load(result);
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                self.pending_load = None;
                self.controller.abort_load("Loader stopped before returning a result");
            }
        }
    }

    /// Move the map to the controller's viewport
    fn sync_map(&mut self) {
        let viewport = *self.controller.viewport();
        self.map_memory.center_at(to_position(viewport.center()));
        if self.map_memory.set_zoom(viewport.zoom()).is_err() {
            log::warn!("Map cannot show zoom level {}", viewport.zoom());
        }
    }

    /// Record pans and zooms done on the map itself
    fn follow_map(&mut self) {
        let zoom = self.map_memory.zoom();
        let detached = self.map_memory.detached();

        let viewport = self.controller.viewport_mut();
        viewport.set_zoom(zoom);
        if let Some(center) = detached {
            viewport.set_center(from_position(center));
        }
    }

    fn reset_view(&mut self) {
        let center = self.controller.config().initial_center;
        let zoom = self.controller.config().initial_zoom;
        let viewport = self.controller.viewport_mut();
        viewport.set_center(center);
        viewport.set_zoom(zoom);
        self.sync_map();
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("API:");
            ui.add(egui::TextEdit::singleline(&mut self.api_root_input).desired_width(320.0));

            ui.label("User:");
            ui.add(
                egui::TextEdit::singleline(&mut self.user_id_input)
                    .desired_width(60.0)
                    .hint_text("all"),
            );

            ui.separator();

            let label = if self.controller.entries().is_empty() {
                "📍 Load"
            } else {
                "🔄 Reload"
            };
            if ui
                .add_enabled(!self.is_loading(), egui::Button::new(label))
                .on_hover_text("Fetch the locations again")
                .clicked()
            {
                self.start_load();
            }

            if ui.button("🏠 Reset View").clicked() {
                self.reset_view();
            }
        });
    }

    fn render_map(&mut self, ui: &mut egui::Ui) {
        let map_rect = ui.available_rect_before_wrap();
        let events = MapEvents::default();

        let plugin = OverlayPlugin {
            controller: &self.controller,
            events: &events,
        };
        let my_position = to_position(self.controller.viewport().center());
        let map = Map::new(Some(&mut self.tiles), &mut self.map_memory, my_position)
            .with_plugin(plugin);
        ui.add(map);

        ui.painter().text(
            map_rect.max - egui::vec2(5.0, 5.0),
            egui::Align2::RIGHT_BOTTOM,
            ATTRIBUTION,
            egui::FontId::proportional(10.0),
            egui::Color32::from_black_alpha(150),
        );

        if events.close_popup.get() {
            self.controller.close_info_window();
        }
        match events.clicked.get() {
            Some(id) if self.controller.select_marker(id) => self.sync_map(),
            _ => self.follow_map(),
        }
    }

    fn render_status_bar(&self, ui: &mut egui::Ui) {
        ui.separator();
        ui.horizontal(|ui| {
            ui.label(format!("🌐 {}", self.controller.config().api_root));
            ui.separator();

            let total = self.controller.entries().len();
            let outlined = self
                .controller
                .entries()
                .iter()
                .filter(|e| e.region.is_some())
                .count();

            ui.label(format!("📍 Markers: {}", total));
            ui.separator();
            ui.label(format!("⬟ Outlines: {}", outlined));
            ui.separator();
            ui.label(format!("⚠ Skipped: {}", self.controller.rejected().len()));

            if let Some(entry) = self.controller.current_entry() {
                ui.separator();
                ui.label(format!("☑ {}", entry.title));
            }

            ui.separator();
            ui.label(format!("🔍 {:.1}", self.controller.viewport().zoom()));

            if self.is_loading() {
                ui.separator();
                ui.spinner();
                ui.label("Loading locations...");
            }
        });
    }
}

/// Empty input means "every location"
fn parse_user_id(input: &str) -> Result<Option<u64>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    input
        .parse()
        .map(Some)
        .with_context(|| format!("User must be a number, got {:?}", input))
}

impl eframe::App for CampusMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background task completion
        if self.is_loading() {
            self.check_load_complete();
            ctx.request_repaint(); // Keep refreshing while loading
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            self.render_controls(ui);

            // Error banner
            if let Some(error) = &self.settings_error {
                ui.colored_label(egui::Color32::RED, format!("❌ {}", error));
            }
            if let LoadState::Failed(message) = self.controller.load_state() {
                let message = message.clone();
                ui.horizontal(|ui| {
                    ui.colored_label(
                        egui::Color32::RED,
                        format!("❌ Could not load locations: {}", message),
                    );
                    if ui.add_enabled(!self.is_loading(), egui::Button::new("Retry")).clicked() {
                        self.start_load();
                    }
                });
            }
            ui.add_space(4.0);
        });

        // Status bar at bottom
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.render_status_bar(ui);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.render_map(ui);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("").unwrap(), None);
        assert_eq!(parse_user_id("  ").unwrap(), None);
        assert_eq!(parse_user_id(" 17 ").unwrap(), Some(17));
        assert!(parse_user_id("seventeen").is_err());
        assert!(parse_user_id("-1").is_err());
    }
}
