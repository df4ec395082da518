use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MalformedRecordError;

pub const UNKNOWN_PLACE: &str = "Unknown location";

/// Decoded GeoJSON `FeatureCollection`. Features stay raw so one bad
/// feature cannot fail the whole document.
#[derive(Deserialize, Debug, Clone)]
pub struct FeedDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<FeedMetadata>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FeedMetadata {
    pub title: Option<String>,
    pub generated: Option<i64>,
    pub count: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    pub properties: Option<Properties>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Geometry {
    /// `[longitude, latitude, depth_km]`
    #[serde(default)]
    pub coordinates: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Properties {
    pub mag: Option<f64>,
    pub place: Option<String>,
    pub time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeRecord {
    pub magnitude: f64,
    pub longitude: f64,
    pub latitude: f64,
    pub depth_km: f64,
    pub timestamp_ms: i64,
    pub place: String,
}

impl EarthquakeRecord {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, MalformedRecordError> {
        let feature = Feature::deserialize(value)
            .map_err(|e| MalformedRecordError::Unreadable(e.to_string()))?;
        Self::try_from(feature)
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp_ms)
    }
}

impl TryFrom<Feature> for EarthquakeRecord {
    type Error = MalformedRecordError;

    fn try_from(feature: Feature) -> Result<Self, Self::Error> {
        let properties = feature.properties.ok_or(MalformedRecordError::Missing("properties"))?;
        let geometry = feature.geometry.ok_or(MalformedRecordError::Missing("geometry"))?;

        let magnitude = finite("mag", properties.mag)?;
        let longitude = finite("longitude", geometry.coordinates.first().copied().flatten())?;
        let latitude = finite("latitude", geometry.coordinates.get(1).copied().flatten())?;
        let depth_km = finite("depth", geometry.coordinates.get(2).copied().flatten())?;

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(MalformedRecordError::invalid("longitude", format!("{} is outside [-180, 180]", longitude)));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(MalformedRecordError::invalid("latitude", format!("{} is outside [-90, 90]", latitude)));
        }

        let timestamp_ms = properties.time.ok_or(MalformedRecordError::Missing("time"))?;
        if DateTime::<Utc>::from_timestamp_millis(timestamp_ms).is_none() {
            return Err(MalformedRecordError::invalid("time", format!("{} is not a representable instant", timestamp_ms)));
        }

        Ok(Self {
            magnitude,
            longitude,
            latitude,
            depth_km,
            timestamp_ms,
            place: properties.place.unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
        })
    }
}

fn finite(field: &'static str, value: Option<f64>) -> Result<f64, MalformedRecordError> {
    match value {
        None => Err(MalformedRecordError::Missing(field)),
        Some(v) if !v.is_finite() => Err(MalformedRecordError::invalid(field, "not a finite number")),
        Some(v) => Ok(v),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarkerDescriptor {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub fill_color: String,
    pub popup_text: String,
}
