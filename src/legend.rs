use serde::Serialize;

use crate::depth::{DepthClassifier, BUCKET_COUNT};

/// Lower bound of each legend row, shallowest first.
pub const LEGEND_BOUNDARIES_KM: [f64; BUCKET_COUNT] = [-10.0, 10.0, 30.0, 50.0, 70.0, 90.0];

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub lower_bound: f64,
    /// `None` for the last, unbounded row.
    pub upper_bound: Option<f64>,
    pub color: String,
    pub label: String,
}

/// One entry per boundary, colored with a depth just inside its bucket.
pub fn build_legend(classifier: &DepthClassifier) -> Vec<LegendEntry> {
    LEGEND_BOUNDARIES_KM
        .iter()
        .enumerate()
        .map(|(i, &lower)| {
            let upper = LEGEND_BOUNDARIES_KM.get(i + 1).copied();
            let label = match upper {
                Some(upper) => format!("{}\u{2013}{}", lower, upper),
                None => format!("{}+", lower),
            };
            LegendEntry {
                lower_bound: lower,
                upper_bound: upper,
                color: classifier.classify(lower + 1.0).to_string(),
                label,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_ascending_entries_with_open_top() {
        let legend = build_legend(&DepthClassifier::default());
        assert_eq!(legend.len(), 6);
        assert!(legend.windows(2).all(|w| w[0].lower_bound < w[1].lower_bound));
        assert!(legend.windows(2).all(|w| w[0].upper_bound == Some(w[1].lower_bound)));
        assert_eq!(legend[5].upper_bound, None);
    }

    #[test]
    fn colors_follow_classifier() {
        let classifier = DepthClassifier::default();
        let legend = build_legend(&classifier);
        let colors: Vec<&str> = legend.iter().map(|e| e.color.as_str()).collect();
        assert_eq!(colors, classifier.palette());
    }

    #[test]
    fn labels() {
        let legend = build_legend(&DepthClassifier::default());
        assert_eq!(legend[0].label, "-10\u{2013}10");
        assert_eq!(legend[3].label, "50\u{2013}70");
        assert_eq!(legend[5].label, "90+");
    }

    #[test]
    fn serializes_unbounded_as_null() {
        let legend = build_legend(&DepthClassifier::default());
        let json = serde_json::to_value(&legend[5]).unwrap();
        assert_eq!(json["upperBound"], serde_json::Value::Null);
        assert_eq!(json["lowerBound"], 90.0);
        assert_eq!(json["color"], "#000000");
    }
}
