use foundation::math::GeographicPoint;
use serde_json::{Map, Value};
use thiserror::Error;

/// A closed ring of boundary vertices, as stored (closing vertex included if present).
pub type Ring = Vec<GeographicPoint>;

/// One polygon: outer ring first, then holes.
pub type Polygon = Vec<Ring>;

/// A named landmass.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub name: Option<String>,
    pub polygons: Vec<Polygon>,
}

impl BoundaryFeature {
    pub fn ring_count(&self) -> usize {
        self.polygons.iter().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryCollection {
    pub features: Vec<BoundaryFeature>,
}

#[derive(Debug, Error)]
pub enum BoundaryParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
}

impl BoundaryCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, BoundaryParseError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_geojson_value(&value)
    }

    /// Features whose geometry is `null` or not a (Multi)Polygon are skipped.
    pub fn from_geojson_value(value: &Value) -> Result<Self, BoundaryParseError> {
        let obj = value
            .as_object()
            .ok_or(BoundaryParseError::NotAFeatureCollection)?;
        if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(BoundaryParseError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(BoundaryParseError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: String| BoundaryParseError::InvalidFeature { index, reason };
            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object".to_string()))?;

            match feat_obj.get("type").and_then(Value::as_str) {
                Some("Feature") => {}
                Some(other) => return Err(invalid(format!("unexpected feature type: {other}"))),
                None => return Err(invalid("feature missing type".to_string())),
            }

            let name = feature_name(feat_obj);
            let Some(geometry) = feat_obj.get("geometry").filter(|g| !g.is_null()) else {
                tracing::debug!(index, ?name, "skipping feature without geometry");
                continue;
            };
            let Some(polygons) = parse_geometry(geometry).map_err(invalid)? else {
                tracing::debug!(index, ?name, "skipping non-polygon feature");
                continue;
            };
            features.push(BoundaryFeature { name, polygons });
        }

        Ok(Self { features })
    }

    pub fn ring_count(&self) -> usize {
        self.features.iter().map(BoundaryFeature::ring_count).sum()
    }
}

fn feature_name(feat: &Map<String, Value>) -> Option<String> {
    let props = feat.get("properties").and_then(Value::as_object);
    let from_props = props.and_then(|p| {
        ["name", "NAME", "CONTINENT"]
            .iter()
            .find_map(|k| p.get(*k).and_then(Value::as_str))
    });
    match (from_props, feat.get("id")) {
        (Some(name), _) => Some(name.to_string()),
        (None, Some(Value::String(s))) => Some(s.clone()),
        (None, Some(Value::Number(n))) => Some(n.to_string()),
        _ => None,
    }
}

/// `Ok(None)` for geometry types that carry no area.
fn parse_geometry(value: &Value) -> Result<Option<Vec<Polygon>>, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type".to_string())?;

    match ty {
        "Polygon" | "MultiPolygon" => {}
        _ => return Ok(None),
    }
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    if ty == "Polygon" {
        Ok(Some(vec![parse_polygon(coords)?]))
    } else {
        Ok(Some(parse_multi_polygon(coords)?))
    }
}

fn parse_position(coords: &Value) -> Result<GeographicPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(GeographicPoint::new(lat, lon))
}

fn parse_ring(coords: &Value) -> Result<Ring, String> {
    coords
        .as_array()
        .ok_or("ring must be an array of positions".to_string())?
        .iter()
        .map(parse_position)
        .collect()
}

fn parse_polygon(coords: &Value) -> Result<Polygon, String> {
    coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?
        .iter()
        .map(parse_ring)
        .collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Polygon>, String> {
    coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?
        .iter()
        .map(parse_polygon)
        .collect()
}
