// Slippy map view: OpenStreetMap tiles from walkers with the location overlay on top
use campusmap_core::{LatLng, LocationId, LocationOverlayController, MarkerEntry, Region, Rgb};
use eframe::egui;
use std::cell::Cell;
use walkers::sources::{Attribution, TileSource};
use walkers::{MapMemory, Plugin, Position, Projector};

/// How close (in pixels) a click must land to a marker to select it
const PICK_TOLERANCE: f64 = 12.0;
const MARKER_RADIUS: f32 = 7.0;
const SELECTED_MARKER_RADIUS: f32 = 9.0;

const MARKER_COLOR: egui::Color32 = egui::Color32::from_rgb(234, 67, 53);
const SELECTED_MARKER_COLOR: egui::Color32 = egui::Color32::from_rgb(165, 14, 14);

pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// Raster tiles fetched from a `{z}/{x}/{y}` URL pattern
#[derive(Debug, Clone)]
pub struct UrlTileSource {
    url_pattern: String,
}

impl UrlTileSource {
    pub fn new(url_pattern: impl Into<String>) -> Self {
        Self {
            url_pattern: url_pattern.into(),
        }
    }
}

impl TileSource for UrlTileSource {
    fn tile_url(&self, tile_id: walkers::TileId) -> String {
        self.url_pattern
            .replace("{z}", &tile_id.zoom.to_string())
            .replace("{x}", &tile_id.x.to_string())
            .replace("{y}", &tile_id.y.to_string())
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: ATTRIBUTION,
            url: "https://www.openstreetmap.org/copyright",
            logo_light: None,
            logo_dark: None,
        }
    }
}

pub fn to_position(point: LatLng) -> Position {
    walkers::lat_lon(point.lat, point.lng)
}

/// walkers positions are points with longitude as x
pub fn from_position(position: Position) -> LatLng {
    LatLng::new(position.y(), position.x())
}

/// What the user did on the map during one frame
#[derive(Debug, Default)]
pub struct MapEvents {
    pub clicked: Cell<Option<LocationId>>,
    pub close_popup: Cell<bool>,
}

/// Draws visible regions, markers and the open popup, and reports marker clicks
pub struct OverlayPlugin<'a> {
    pub controller: &'a LocationOverlayController,
    pub events: &'a MapEvents,
}

impl Plugin for OverlayPlugin<'_> {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let to_screen = |point: LatLng| projector.project(to_position(point)).to_pos2();
        let to_offset = |point: LatLng| {
            let pos = to_screen(point);
            (pos.x as f64, pos.y as f64)
        };
        let pick = |pos: egui::Pos2| {
            self.controller
                .pick_marker((pos.x as f64, pos.y as f64), PICK_TOLERANCE, to_offset)
        };

        let painter = ui.painter().with_clip_rect(response.rect);

        for (_, region) in self.controller.visible_regions() {
            draw_region(&painter, region, to_screen);
        }

        let current = self.controller.current();
        for entry in self.controller.entries() {
            let pos = to_screen(entry.position);
            if !response.rect.expand(SELECTED_MARKER_RADIUS).contains(pos) {
                continue;
            }

            let (radius, color) = if current == Some(entry.id) {
                (SELECTED_MARKER_RADIUS, SELECTED_MARKER_COLOR)
            } else {
                (MARKER_RADIUS, MARKER_COLOR)
            };
            painter.circle_filled(pos, radius, color);
            painter.circle_stroke(pos, radius, egui::Stroke::new(1.5, egui::Color32::WHITE));
        }

        if response.clicked() {
            if let Some(pointer) = response.interact_pointer_pos() {
                self.events.clicked.set(pick(pointer));
            }
        }

        if let Some(entry) = self.controller.current_entry() {
            let anchor = to_screen(entry.position);
            if entry.info.is_open() && response.rect.contains(anchor) {
                self.events
                    .close_popup
                    .set(render_info_window(ui.ctx(), entry, anchor));
            }
        }

        let hovered = response
            .hover_pos()
            .and_then(pick)
            .and_then(|id| self.controller.entry(id));
        if let Some(entry) = hovered {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            response.clone().on_hover_text(&entry.title);
        }
    }
}

fn draw_region(
    painter: &egui::Painter,
    region: &Region,
    to_screen: impl Fn(LatLng) -> egui::Pos2,
) {
    let style = &region.style;

    let fill = with_opacity(style.fill_color, style.fill_opacity);
    painter.add(egui::Shape::mesh(fill_mesh(region, fill, &to_screen)));

    let outline: Vec<egui::Pos2> = region.path.iter().map(|p| to_screen(*p)).collect();
    painter.add(egui::Shape::closed_line(
        outline,
        egui::Stroke::new(
            style.stroke_weight,
            with_opacity(style.stroke_color, style.stroke_opacity),
        ),
    ));
}

/// One colored triangle per fill triangle of the region
fn fill_mesh(
    region: &Region,
    color: egui::Color32,
    to_screen: impl Fn(LatLng) -> egui::Pos2,
) -> egui::Mesh {
    let mut mesh = egui::Mesh::default();
    for triangle in &region.fill {
        let base = mesh.vertices.len() as u32;
        for corner in triangle {
            mesh.colored_vertex(to_screen(*corner), color);
        }
        mesh.add_triangle(base, base + 1, base + 2);
    }
    mesh
}

/// Draw the popup above its marker. Returns true when the close button was hit.
fn render_info_window(ctx: &egui::Context, entry: &MarkerEntry, anchor: egui::Pos2) -> bool {
    let mut close = false;

    egui::Area::new(egui::Id::new("info_window"))
        .order(egui::Order::Foreground)
        .fixed_pos(anchor - egui::vec2(0.0, SELECTED_MARKER_RADIUS + 4.0))
        .pivot(egui::Align2::CENTER_BOTTOM)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_max_width(280.0);
                ui.horizontal(|ui| {
                    ui.heading(&entry.info.content.name);
                    if ui.small_button("✖").on_hover_text("Close").clicked() {
                        close = true;
                    }
                });
                ui.label(&entry.info.content.address);
                ui.label(entry.info.content.classrooms_line());
            });
        });

    close
}

fn with_opacity(color: Rgb, opacity: f32) -> egui::Color32 {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(color.0, color.1, color.2, alpha)
}
