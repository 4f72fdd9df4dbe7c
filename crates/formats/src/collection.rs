use std::fmt;

use serde_json::Value;

use foundation::geo::GeoPoint;
use spatial::feature::{FeatureKind, PointFeature};

/// Result of ingesting one GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCollection {
    pub features: Vec<PointFeature>,
    pub warnings: Vec<FeatureWarning>,
}

/// A feature entry skipped during ingestion.
///
/// One broken record never fails the whole collection; it is dropped and
/// reported instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureWarning {
    pub index: usize,
    pub feature_id: Option<String>,
    pub reason: String,
}

impl fmt::Display for FeatureWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.feature_id {
            Some(id) => write!(f, "feature {id} (index {}): {}", self.index, self.reason),
            None => write!(f, "feature at index {}: {}", self.index, self.reason),
        }
    }
}

#[derive(Debug)]
pub enum CollectionError {
    Parse(serde_json::Error),
    NotAFeatureCollection,
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::Parse(err) => write!(f, "JSON parse error: {err}"),
            CollectionError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
        }
    }
}

impl std::error::Error for CollectionError {}

/// Parse a GeoJSON `FeatureCollection` of `Point` features.
///
/// Every retained feature gets `kind` and a stable string id: the GeoJSON
/// `id` (numbers stringified) or, failing that, the feature's index in
/// the collection.
pub fn parse_feature_collection(
    payload: &str,
    kind: FeatureKind,
) -> Result<ParsedCollection, CollectionError> {
    let value: Value = serde_json::from_str(payload).map_err(CollectionError::Parse)?;
    collection_from_value(&value, kind)
}

pub fn collection_from_value(
    value: &Value,
    kind: FeatureKind,
) -> Result<ParsedCollection, CollectionError> {
    let obj = value
        .as_object()
        .ok_or(CollectionError::NotAFeatureCollection)?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or(CollectionError::NotAFeatureCollection)?;
    if ty != "FeatureCollection" {
        return Err(CollectionError::NotAFeatureCollection);
    }

    let features_val = obj
        .get("features")
        .and_then(|v| v.as_array())
        .ok_or(CollectionError::NotAFeatureCollection)?;

    let mut features = Vec::with_capacity(features_val.len());
    let mut warnings = Vec::new();
    for (index, feat_val) in features_val.iter().enumerate() {
        match parse_feature(feat_val, index, kind) {
            Ok(feature) => features.push(feature),
            Err(warning) => warnings.push(warning),
        }
    }

    Ok(ParsedCollection { features, warnings })
}

fn parse_feature(
    value: &Value,
    index: usize,
    kind: FeatureKind,
) -> Result<PointFeature, FeatureWarning> {
    let warn = |feature_id: Option<String>, reason: String| FeatureWarning {
        index,
        feature_id,
        reason,
    };

    let Some(obj) = value.as_object() else {
        return Err(warn(None, "feature must be an object".to_string()));
    };

    let id = match obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let feat_type = obj.get("type").and_then(|v| v.as_str());
    if feat_type != Some("Feature") {
        return Err(warn(id, "feature missing type \"Feature\"".to_string()));
    }

    let Some(name) = obj
        .get("properties")
        .and_then(|v| v.as_object())
        .and_then(|props| props.get("name"))
        .and_then(|v| v.as_str())
    else {
        return Err(warn(id, "feature missing properties.name".to_string()));
    };

    let Some(geometry) = obj.get("geometry").and_then(|v| v.as_object()) else {
        return Err(warn(id, "feature missing geometry".to_string()));
    };
    let geom_type = geometry.get("type").and_then(|v| v.as_str());
    if geom_type != Some("Point") {
        return Err(warn(
            id,
            format!("unsupported geometry type: {}", geom_type.unwrap_or("none")),
        ));
    }

    let Some(coords) = geometry.get("coordinates").and_then(|v| v.as_array()) else {
        return Err(warn(id, "Point coordinates must be an array".to_string()));
    };
    if coords.len() < 2 {
        return Err(warn(id, "Point coordinates must have [lon, lat]".to_string()));
    }
    let (Some(lon), Some(lat)) = (coords[0].as_f64(), coords[1].as_f64()) else {
        return Err(warn(id, "Point coordinates must be numbers".to_string()));
    };

    Ok(PointFeature::new(
        id.unwrap_or_else(|| index.to_string()),
        name,
        kind,
        GeoPoint::new(lon, lat),
    ))
}
