use crate::error::{FetchError, ValidationError};
use crate::geo::LatLng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Backend identifier of a location
pub type LocationId = i64;

/// A validated location record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub address: String,
    /// Free text list of rooms where lessons take place
    pub classrooms: String,
    pub position: LatLng,
    /// Encoded outline of the building, if the backend has one
    pub polyline: Option<String>,
}

/// Outcome of parsing a locations payload
#[derive(Debug, Clone, Default)]
pub struct LocationLoad {
    /// Valid records in payload order
    pub locations: Vec<Location>,
    /// Records that were skipped
    pub rejected: Vec<ValidationError>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    locations: Vec<serde_json::Value>,
}

/// A record as the backend sends it. Nullable columns stay optional here.
#[derive(Debug, Deserialize)]
struct RawLocation {
    id: LocationId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    classrooms: Option<Classrooms>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
    #[serde(default)]
    polyline: Option<String>,
}

// Older backends send the room names as a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Classrooms {
    Text(String),
    List(Vec<String>),
}

impl Classrooms {
    fn into_text(self) -> String {
        match self {
            Classrooms::Text(text) => text,
            Classrooms::List(rooms) => rooms.join(", "),
        }
    }
}

impl RawLocation {
    fn validate(self, index: usize) -> Result<Location, ValidationError> {
        let (lat, lng) = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => (lat, lng),
            _ => {
                return Err(ValidationError::new(
                    index,
                    Some(self.id),
                    "missing coordinates",
                ))
            }
        };

        let position = LatLng::new(lat, lng);
        if !position.is_valid() {
            return Err(ValidationError::new(
                index,
                Some(self.id),
                format!("coordinates out of range: {}, {}", lat, lng),
            ));
        }

        Ok(Location {
            id: self.id,
            name: self.name.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            classrooms: self.classrooms.map(Classrooms::into_text).unwrap_or_default(),
            position,
            // An empty outline is the same as no outline
            polyline: self.polyline.filter(|p| !p.trim().is_empty()),
        })
    }
}

/// Parse a `{"locations": [...]}` body.
///
/// Fails only when the document itself is unusable. Bad individual records are
/// logged and collected in [`LocationLoad::rejected`].
pub fn parse_locations(body: &str) -> Result<LocationLoad, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    let mut load = LocationLoad::default();
    let mut seen = HashSet::new();

    for (index, value) in envelope.locations.into_iter().enumerate() {
        match parse_record(index, value, &seen) {
            Ok(location) => {
                seen.insert(location.id);
                load.locations.push(location);
            }
            Err(e) => {
                log::warn!("Skipping {}", e);
                load.rejected.push(e);
            }
        }
    }

    log::debug!(
        "Parsed {} locations ({} rejected)",
        load.locations.len(),
        load.rejected.len()
    );

    Ok(load)
}

fn parse_record(
    index: usize,
    value: serde_json::Value,
    seen: &HashSet<LocationId>,
) -> Result<Location, ValidationError> {
    if !value.is_object() {
        return Err(ValidationError::new(index, None, "not an object"));
    }

    let id_hint = value.get("id").and_then(serde_json::Value::as_i64);
    let raw: RawLocation = serde_json::from_value(value)
        .map_err(|e| ValidationError::new(index, id_hint, e.to_string()))?;

    if seen.contains(&raw.id) {
        return Err(ValidationError::new(index, Some(raw.id), "duplicate id"));
    }

    raw.validate(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VENICE_CAMPUS: &str = r#"{"locations":[{"id":1,"name":"Venice Campus","address":"Dorsoduro 123","classrooms":"101,102","lat":45.435,"lng":12.335,"polyline":null}]}"#;

    #[test]
    fn test_parse_single_location() {
        let load = parse_locations(VENICE_CAMPUS).unwrap();
        assert!(load.rejected.is_empty());
        assert_eq!(load.locations.len(), 1);

        let loc = &load.locations[0];
        assert_eq!(loc.id, 1);
        assert_eq!(loc.name, "Venice Campus");
        assert_eq!(loc.address, "Dorsoduro 123");
        assert_eq!(loc.classrooms, "101,102");
        assert_eq!(loc.position, LatLng::new(45.435, 12.335));
        assert_eq!(loc.polyline, None);
    }

    #[test]
    fn test_parse_empty_list() {
        let load = parse_locations(r#"{"locations":[]}"#).unwrap();
        assert!(load.locations.is_empty());
        assert!(load.rejected.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_document() {
        assert!(matches!(
            parse_locations("<html>login</html>"),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            parse_locations(r#"{"courses":[]}"#),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            parse_locations(r#"{"locations":{}}"#),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_bad_record_is_skipped() {
        let body = r#"{"locations":[
            {"id":1,"name":"San Giobbe","address":"Cannaregio 873","lat":45.4434,"lng":12.3214},
            {"id":2,"name":"Nowhere","address":"","lat":null,"lng":null},
            "garbage",
            {"id":"four","name":"Bad id","lat":1.0,"lng":1.0},
            {"id":5,"name":"Ca' Foscari","address":"Dorsoduro 3246","lat":45.4343,"lng":12.3267,"polyline":"_p~iF~ps|U_ulLnnqC_mqNvxq`@"}
        ]}"#;

        let load = parse_locations(body).unwrap();
        let ids: Vec<_> = load.locations.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 5]);

        assert_eq!(load.rejected.len(), 3);
        assert_eq!(load.rejected[0].index, 1);
        assert_eq!(load.rejected[0].id, Some(2));
        assert_eq!(load.rejected[0].reason, "missing coordinates");
        assert_eq!(load.rejected[1].index, 2);
        assert_eq!(load.rejected[1].id, None);
        assert_eq!(load.rejected[2].index, 3);
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let body = r#"{"locations":[{"id":3,"name":"X","address":"Y","lat":123.0,"lng":12.0}]}"#;
        let load = parse_locations(body).unwrap();
        assert!(load.locations.is_empty());
        assert!(load.rejected[0].reason.starts_with("coordinates out of range"));
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let body = r#"{"locations":[
            {"id":9,"name":"First","address":"","lat":45.0,"lng":12.0},
            {"id":9,"name":"Second","address":"","lat":46.0,"lng":13.0}
        ]}"#;
        let load = parse_locations(body).unwrap();
        assert_eq!(load.locations.len(), 1);
        assert_eq!(load.locations[0].name, "First");
        assert_eq!(load.rejected[0].reason, "duplicate id");
    }

    #[test]
    fn test_optional_fields() {
        let body = r#"{"locations":[
            {"id":1,"name":null,"lat":45.0,"lng":12.0,"polyline":""},
            {"id":2,"name":"Rooms","address":"A","classrooms":["Aula 1","Aula 2"],"lat":45.0,"lng":12.0}
        ]}"#;
        let load = parse_locations(body).unwrap();
        assert_eq!(load.locations.len(), 2);

        let first = &load.locations[0];
        assert_eq!(first.name, "");
        assert_eq!(first.address, "");
        assert_eq!(first.classrooms, "");
        assert_eq!(first.polyline, None);

        assert_eq!(load.locations[1].classrooms, "Aula 1, Aula 2");
    }
}
