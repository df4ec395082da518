//! Depth bucketing for marker colors.
//!
//! Depths are split into six half-open intervals:
//! (-inf, 10], (10, 30], (30, 50], (50, 70], (70, 90], (90, inf).
//! The first threshold the depth does not exceed picks the color; anything
//! deeper than the last threshold gets the overflow color.

pub const BUCKET_COUNT: usize = 6;

/// Upper bounds (km, inclusive) of every bucket except the overflow one.
pub const DEPTH_THRESHOLDS_KM: [f64; BUCKET_COUNT - 1] = [10.0, 30.0, 50.0, 70.0, 90.0];

/// Shallow to deep: yellow, light green, dark green, red, dark red, black.
pub const DEFAULT_PALETTE: [&str; BUCKET_COUNT] =
    ["#FFFF00", "#00FF00", "#006400", "#BC0000", "#8B0000", "#000000"];

#[derive(Debug, Clone, PartialEq)]
pub struct DepthClassifier {
    bands: [(f64, String); BUCKET_COUNT - 1],
    overflow: String,
}

impl DepthClassifier {
    pub fn new(palette: [String; BUCKET_COUNT]) -> Self {
        let [c0, c1, c2, c3, c4, overflow] = palette;
        let [t0, t1, t2, t3, t4] = DEPTH_THRESHOLDS_KM;
        Self {
            bands: [(t0, c0), (t1, c1), (t2, c2), (t3, c3), (t4, c4)],
            overflow,
        }
    }

    /// Index of the bucket `depth_km` falls in, `0..BUCKET_COUNT`.
    pub fn bucket(&self, depth_km: f64) -> usize {
        self.bands
            .iter()
            .position(|(threshold, _)| depth_km <= *threshold)
            .unwrap_or(self.bands.len())
    }

    pub fn classify(&self, depth_km: f64) -> &str {
        match self.bands.get(self.bucket(depth_km)) {
            Some((_, color)) => color,
            None => &self.overflow,
        }
    }

    pub fn palette(&self) -> Vec<&str> {
        self.bands
            .iter()
            .map(|(_, color)| color.as_str())
            .chain(std::iter::once(self.overflow.as_str()))
            .collect()
    }
}

impl Default for DepthClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.map(String::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_scenarios() {
        let classifier = DepthClassifier::default();
        assert_eq!(classifier.classify(5.0), "#FFFF00");
        assert_eq!(classifier.classify(10.0), "#FFFF00");
        assert_eq!(classifier.classify(10.1), "#00FF00");
        assert_eq!(classifier.classify(95.0), "#000000");
    }

    #[test]
    fn every_threshold_is_inclusive_upper_bound() {
        let classifier = DepthClassifier::default();
        for (i, threshold) in DEPTH_THRESHOLDS_KM.iter().enumerate() {
            assert_eq!(classifier.bucket(*threshold), i);
            assert_eq!(classifier.bucket(threshold + 1e-9), i + 1);
        }
    }

    #[test]
    fn negative_and_extreme_depths_classify() {
        let classifier = DepthClassifier::default();
        assert_eq!(classifier.bucket(-3.2), 0);
        assert_eq!(classifier.bucket(f64::MIN), 0);
        assert_eq!(classifier.bucket(700.0), 5);
        assert_eq!(classifier.bucket(f64::MAX), 5);
    }

    #[test]
    fn buckets_partition_without_gaps() {
        let classifier = DepthClassifier::default();
        let mut last = 0;
        let mut depth = -50.0;
        while depth <= 150.0 {
            let bucket = classifier.bucket(depth);
            assert!(bucket == last || bucket == last + 1, "skipped a bucket at {depth}");
            assert_eq!(classifier.classify(depth), classifier.palette()[bucket]);
            assert_eq!(classifier.classify(depth), classifier.classify(depth));
            last = bucket;
            depth += 0.25;
        }
        assert_eq!(last, BUCKET_COUNT - 1);
    }

    #[test]
    fn custom_palette_is_used_in_order() {
        let palette = ["a", "b", "c", "d", "e", "f"].map(String::from);
        let classifier = DepthClassifier::new(palette);
        assert_eq!(classifier.palette(), vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(classifier.classify(45.0), "c");
        assert_eq!(classifier.classify(90.5), "f");
    }
}
