use tracing::error;

use crate::error::FeedUnavailableError;
use crate::feed::FeedSource;
use crate::renderer::{FeatureRenderer, RenderPass};

/// Fetches the feed, then maps it to markers. A fetch failure ends the pass
/// before any marker is produced.
pub async fn render_pass<F>(feed: &F, renderer: &FeatureRenderer) -> Result<RenderPass, FeedUnavailableError>
where
    F: FeedSource + ?Sized,
{
    let document = feed.fetch().await.map_err(|e| {
        error!("render pass aborted: {}", e);
        e
    })?;
    Ok(renderer.render(&document.features))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::FeedFailure;
    use crate::models::FeedDocument;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    pub(crate) struct StaticFeed(pub Vec<serde_json::Value>);

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch(&self) -> Result<FeedDocument, FeedUnavailableError> {
            Ok(FeedDocument {
                kind: "FeatureCollection".to_string(),
                features: self.0.clone(),
                metadata: None,
            })
        }
    }

    pub(crate) struct DownFeed;

    #[async_trait]
    impl FeedSource for DownFeed {
        async fn fetch(&self) -> Result<FeedDocument, FeedUnavailableError> {
            Err(FeedUnavailableError {
                url: "http://feed.invalid/all_week.geojson".to_string(),
                attempts: 1,
                reason: FeedFailure::Timeout(Duration::from_secs(10)),
            })
        }
    }

    pub(crate) fn quake(mag: serde_json::Value, lon: f64, lat: f64, depth: f64) -> serde_json::Value {
        json!({
            "type": "Feature",
            "properties": { "mag": mag, "place": "Offshore", "time": 1700000000000_i64 },
            "geometry": { "type": "Point", "coordinates": [lon, lat, depth] }
        })
    }

    #[tokio::test]
    async fn successful_pass_maps_every_valid_feature() {
        let feed = StaticFeed(vec![
            quake(json!(4.0), 140.1, 35.7, 45.0),
            quake(serde_json::Value::Null, 140.2, 35.8, 12.0),
            quake(json!(1.0), 140.3, 35.9, 91.0),
        ]);
        let pass = render_pass(&feed, &FeatureRenderer::default()).await.unwrap();
        assert_eq!(pass.markers.len(), 2);
        assert_eq!(pass.skipped.len(), 1);
        assert_eq!(pass.markers[0].radius, 10.0);
        assert_eq!(pass.markers[0].fill_color, "#006400");
    }

    #[tokio::test]
    async fn feed_failure_yields_single_error() {
        let result = render_pass(&DownFeed, &FeatureRenderer::default()).await;
        let err = result.unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(matches!(err.reason, FeedFailure::Timeout(_)));
    }

    #[tokio::test]
    async fn works_through_trait_object() {
        let feed: Box<dyn FeedSource> = Box::new(StaticFeed(vec![quake(json!(9.0), 0.0, 0.0, 0.0)]));
        let pass = render_pass(feed.as_ref(), &FeatureRenderer::default()).await.unwrap();
        assert_eq!(pass.markers[0].radius, 15.0);
    }
}
