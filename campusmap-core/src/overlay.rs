use crate::geo::LatLng;
use crate::location::{Location, LocationId};
use crate::polyline;
use geo::{Coord, LineString, Polygon, TriangulateEarcut};
use serde::Serialize;

/// Caption in front of the classroom list in info windows
pub const CLASSROOMS_LABEL: &str = "Lezioni in";

/// An sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const RED: Rgb = Rgb(0xFF, 0x00, 0x00);

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Stroke and fill of highlight regions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionStyle {
    pub stroke_color: Rgb,
    pub stroke_opacity: f32,
    /// Stroke width in pixels
    pub stroke_weight: f32,
    pub fill_color: Rgb,
    pub fill_opacity: f32,
}

impl Default for RegionStyle {
    fn default() -> Self {
        Self {
            stroke_color: Rgb::RED,
            stroke_opacity: 0.8,
            stroke_weight: 3.0,
            fill_color: Rgb::RED,
            fill_opacity: 0.35,
        }
    }
}

/// Building outline shown while its marker is selected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub path: Vec<LatLng>,
    pub style: RegionStyle,
    /// Fill triangles covering the outline, concave parts included
    #[serde(skip)]
    pub fill: Vec<[LatLng; 3]>,
    visible: bool,
}

impl Region {
    pub fn new(path: Vec<LatLng>, style: RegionStyle) -> Self {
        let fill = triangulate(&path);
        Self {
            path,
            style,
            fill,
            visible: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Ear-cut the outline into triangles. Longitude is x and latitude is y.
fn triangulate(path: &[LatLng]) -> Vec<[LatLng; 3]> {
    let ring: LineString<f64> = path
        .iter()
        .map(|p| Coord { x: p.lng, y: p.lat })
        .collect();
    let to_lat_lng = |c: Coord<f64>| LatLng::new(c.y, c.x);

    let polygon = Polygon::new(ring, vec![]);
    if polygon.exterior().0.len() < 4 {
        // Fewer than three distinct corners once closed
        return Vec::new();
    }
    polygon
        .earcut_triangles_iter()
        .map(|t| [to_lat_lng(t.0), to_lat_lng(t.1), to_lat_lng(t.2)])
        .collect()
}

/// Text shown in a marker's info window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoContent {
    pub name: String,
    pub address: String,
    pub classrooms: String,
}

impl InfoContent {
    pub fn classrooms_line(&self) -> String {
        format!("{}: {}", CLASSROOMS_LABEL, self.classrooms)
    }

    /// HTML fragment for embedding in a web page. All text is escaped.
    pub fn to_html(&self) -> String {
        format!(
            concat!(
                "<div id=\"content\">",
                "<div id=\"siteNotice\"></div>",
                "<h1 id=\"firstHeading\" class=\"firstHeading\">{}</h1>",
                "<div id=\"bodyContent\">",
                "<p>{}</p>",
                "<p>{}</p>",
                "</div>",
                "</div>"
            ),
            escape_html(&self.name),
            escape_html(&self.address),
            escape_html(&self.classrooms_line()),
        )
    }
}

impl std::fmt::Display for InfoContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", self.address)?;
        write!(f, "{}", self.classrooms_line())
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Popup anchored to a marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoWindow {
    pub content: InfoContent,
    open: bool,
}

impl InfoWindow {
    pub fn new(content: InfoContent) -> Self {
        Self {
            content,
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }
}

/// Everything drawn for one location: the marker, its popup and its outline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerEntry {
    pub id: LocationId,
    /// Hover text of the marker
    pub title: String,
    pub position: LatLng,
    pub info: InfoWindow,
    pub region: Option<Region>,
}

impl MarkerEntry {
    /// Build the entry for a location. The region starts hidden and the info
    /// window closed.
    pub fn from_location(location: &Location, style: RegionStyle) -> Self {
        let region = location
            .polyline
            .as_deref()
            .and_then(|encoded| decode_region(location.id, encoded, style));

        Self {
            id: location.id,
            title: location.name.clone(),
            position: location.position,
            info: InfoWindow::new(InfoContent {
                name: location.name.clone(),
                address: location.address.clone(),
                classrooms: location.classrooms.clone(),
            }),
            region,
        }
    }

    /// Hide the region and close the popup
    pub(crate) fn conceal(&mut self) {
        if let Some(region) = self.region.as_mut() {
            region.set_visible(false);
        }
        self.info.close();
    }

    /// Show the region and open the popup
    pub(crate) fn reveal(&mut self) {
        if let Some(region) = self.region.as_mut() {
            region.set_visible(true);
        }
        self.info.open();
    }
}

fn decode_region(id: LocationId, encoded: &str, style: RegionStyle) -> Option<Region> {
    match polyline::decode(encoded) {
        Ok(path) if path.len() >= 3 => Some(Region::new(path, style)),
        Ok(path) => {
            log::warn!(
                "Outline of location {} has only {} points, not drawing it",
                id,
                path.len()
            );
            None
        }
        Err(e) => {
            log::warn!("Failed to decode outline of location {}: {}", id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(polyline: Option<&str>) -> Location {
        Location {
            id: 42,
            name: "Ca' Foscari".to_string(),
            address: "Dorsoduro 3246".to_string(),
            classrooms: "Aula Baratto".to_string(),
            position: LatLng::new(45.4343, 12.3267),
            polyline: polyline.map(str::to_string),
        }
    }

    #[test]
    fn test_entry_without_polyline() {
        let entry = MarkerEntry::from_location(&location(None), RegionStyle::default());
        assert_eq!(entry.id, 42);
        assert_eq!(entry.title, "Ca' Foscari");
        assert_eq!(entry.position, LatLng::new(45.4343, 12.3267));
        assert!(entry.region.is_none());
        assert!(!entry.info.is_open());
    }

    #[test]
    fn test_entry_with_polyline_starts_hidden() {
        let entry = MarkerEntry::from_location(
            &location(Some("_p~iF~ps|U_ulLnnqC_mqNvxq`@")),
            RegionStyle::default(),
        );
        let region = entry.region.expect("region should be decoded");
        assert_eq!(region.path.len(), 3);
        assert!(!region.is_visible());
        assert_eq!(region.style, RegionStyle::default());
    }

    #[test]
    fn test_bad_polyline_keeps_marker() {
        let entry =
            MarkerEntry::from_location(&location(Some("not a polyline")), RegionStyle::default());
        assert!(entry.region.is_none());

        // A single point is not an outline
        let entry = MarkerEntry::from_location(&location(Some("??")), RegionStyle::default());
        assert!(entry.region.is_none());
    }

    #[test]
    fn test_runaway_outline_keeps_marker() {
        let outline = format!("}}{}^", "~".repeat(10)).repeat(34);
        let entry = MarkerEntry::from_location(&location(Some(&outline)), RegionStyle::default());
        assert_eq!(entry.id, 42);
        assert_eq!(entry.region, None);
    }

    fn triangle_area(t: &[LatLng; 3]) -> f64 {
        let [a, b, c] = t;
        ((b.lng - a.lng) * (c.lat - a.lat) - (c.lng - a.lng) * (b.lat - a.lat)).abs() / 2.0
    }

    #[test]
    fn test_concave_outline_fill() {
        // L-shaped building made of three unit squares
        let path = vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 2.0),
            LatLng::new(1.0, 2.0),
            LatLng::new(1.0, 1.0),
            LatLng::new(2.0, 1.0),
            LatLng::new(2.0, 0.0),
        ];
        let region = Region::new(path, RegionStyle::default());

        assert_eq!(region.fill.len(), 4);
        let area: f64 = region.fill.iter().map(triangle_area).sum();
        // A convex fill would also cover the notch and add up to 4
        assert!((area - 3.0).abs() < 1e-9, "fill area {}", area);
    }

    #[test]
    fn test_closed_two_point_outline_has_no_fill() {
        let path = vec![
            LatLng::new(45.0, 12.0),
            LatLng::new(45.1, 12.1),
            LatLng::new(45.0, 12.0),
        ];
        assert!(Region::new(path, RegionStyle::default()).fill.is_empty());
    }

    #[test]
    fn test_reveal_and_conceal() {
        let mut entry = MarkerEntry::from_location(
            &location(Some("_p~iF~ps|U_ulLnnqC_mqNvxq`@")),
            RegionStyle::default(),
        );
        entry.reveal();
        assert!(entry.info.is_open());
        assert!(entry.region.as_ref().unwrap().is_visible());

        entry.conceal();
        assert!(!entry.info.is_open());
        assert!(!entry.region.as_ref().unwrap().is_visible());
    }

    #[test]
    fn test_info_html_is_escaped() {
        let content = InfoContent {
            name: "Aula <Magna>".to_string(),
            address: "Calle \"Larga\" & Co".to_string(),
            classrooms: "1".to_string(),
        };
        let html = content.to_html();
        assert!(html.contains(
            "<h1 id=\"firstHeading\" class=\"firstHeading\">Aula &lt;Magna&gt;</h1>"
        ));
        assert!(html.contains("<p>Calle &quot;Larga&quot; &amp; Co</p>"));
        assert!(html.contains("<p>Lezioni in: 1</p>"));
    }

    #[test]
    fn test_info_text() {
        let entry = MarkerEntry::from_location(&location(None), RegionStyle::default());
        assert_eq!(
            entry.info.content.to_string(),
            "Ca' Foscari\nDorsoduro 3246\nLezioni in: Aula Baratto"
        );
    }

    #[test]
    fn test_default_style() {
        let style = RegionStyle::default();
        assert_eq!(style.stroke_color.to_hex(), "#FF0000");
        assert_eq!(style.fill_color.to_hex(), "#FF0000");
        assert_eq!(style.stroke_weight, 3.0);
    }
}
