use serde::Serialize;
use tracing::{info, warn};

use crate::depth::DepthClassifier;
use crate::error::MalformedRecordError;
use crate::models::{EarthquakeRecord, MarkerDescriptor};

pub const RADIUS_SCALE: f64 = 5.0;

const POPUP_TIME_FORMAT: &str = "%a %b %d %Y %H:%M:%S UTC";

/// Result of mapping one batch of feed features to markers.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct RenderPass {
    pub markers: Vec<MarkerDescriptor>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// Position of the feature in the feed.
    pub index: usize,
    pub field: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureRenderer {
    classifier: DepthClassifier,
}

impl FeatureRenderer {
    pub fn new(classifier: DepthClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &DepthClassifier {
        &self.classifier
    }

    pub fn marker(&self, record: &EarthquakeRecord) -> Result<MarkerDescriptor, MalformedRecordError> {
        Ok(MarkerDescriptor {
            latitude: record.latitude,
            longitude: record.longitude,
            radius: marker_radius(record.magnitude)?,
            fill_color: self.classifier.classify(record.depth_km).to_string(),
            popup_text: popup_text(record)?,
        })
    }

    /// Validates and maps every feature in feed order. Malformed features are
    /// recorded and skipped; they never abort the batch.
    pub fn render(&self, features: &[serde_json::Value]) -> RenderPass {
        let mut pass = RenderPass::default();
        for (index, value) in features.iter().enumerate() {
            let marker = EarthquakeRecord::from_value(value).and_then(|record| self.marker(&record));
            match marker {
                Ok(marker) => pass.markers.push(marker),
                Err(e) => {
                    warn!("skipping feature {}: {}", index, e);
                    pass.skipped.push(SkippedRecord {
                        index,
                        field: e.field(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!("rendered {} markers, skipped {} features", pass.markers.len(), pass.skipped.len());
        pass
    }
}

pub fn marker_radius(magnitude: f64) -> Result<f64, MalformedRecordError> {
    if !magnitude.is_finite() || magnitude < 0.0 {
        return Err(MalformedRecordError::invalid("mag", format!("{} is not a non-negative magnitude", magnitude)));
    }
    Ok(RADIUS_SCALE * magnitude.sqrt())
}

fn popup_text(record: &EarthquakeRecord) -> Result<String, MalformedRecordError> {
    let time = record
        .time()
        .ok_or_else(|| MalformedRecordError::invalid("time", format!("{} is not a representable instant", record.timestamp_ms)))?;
    Ok(format!(
        "<strong>Magnitude:</strong> {}<br><strong>Place:</strong> {}<br><strong>Time:</strong> {}",
        record.magnitude,
        tera::escape_html(&record.place),
        time.format(POPUP_TIME_FORMAT),
    ))
}
