use serde_json::json;
use tracing::warn;

use crate::error::SurfaceError;
use crate::legend::LegendEntry;
use crate::models::MarkerDescriptor;

/// Something markers and a legend can be drawn onto.
pub trait MapSurface {
    fn add_marker(&mut self, marker: &MarkerDescriptor) -> Result<(), SurfaceError>;

    fn render_legend_entries(&mut self, entries: &[LegendEntry]);
}

/// Hands every marker to `surface`, then the legend. Returns how many
/// markers the surface refused; a refusal never stops the rest.
pub fn draw<S: MapSurface + ?Sized>(surface: &mut S, markers: &[MarkerDescriptor], legend: &[LegendEntry]) -> usize {
    let mut failed = 0;
    for marker in markers {
        if let Err(e) = surface.add_marker(marker) {
            warn!("marker not drawn: {}", e);
            failed += 1;
        }
    }
    surface.render_legend_entries(legend);
    failed
}

/// Collects markers as GeoJSON point features for the page and the API.
#[derive(Debug, Default)]
pub struct MapLayer {
    features: Vec<serde_json::Value>,
    legend: Vec<LegendEntry>,
}

impl MapLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    pub fn feature_collection(&self) -> serde_json::Value {
        json!({
            "type": "FeatureCollection",
            "features": self.features,
        })
    }
}

impl MapSurface for MapLayer {
    fn add_marker(&mut self, marker: &MarkerDescriptor) -> Result<(), SurfaceError> {
        if !marker.latitude.is_finite() || !marker.longitude.is_finite() {
            return Err(SurfaceError::Position {
                latitude: marker.latitude,
                longitude: marker.longitude,
            });
        }
        if !marker.radius.is_finite() || marker.radius < 0.0 {
            return Err(SurfaceError::Radius(marker.radius));
        }

        self.features.push(json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [marker.longitude, marker.latitude] },
            "properties": {
                "radius": marker.radius,
                "fillColor": marker.fill_color,
                "popupText": marker.popup_text,
            }
        }));
        Ok(())
    }

    fn render_legend_entries(&mut self, entries: &[LegendEntry]) {
        self.legend = entries.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::DepthClassifier;
    use crate::legend::build_legend;

    fn marker(latitude: f64, radius: f64) -> MarkerDescriptor {
        MarkerDescriptor {
            latitude,
            longitude: -70.5,
            radius,
            fill_color: "#BC0000".to_string(),
            popup_text: "<strong>Magnitude:</strong> 5".to_string(),
        }
    }

    #[derive(Default)]
    struct Recording {
        drawn: Vec<f64>,
        legend_rows: usize,
    }

    impl MapSurface for Recording {
        fn add_marker(&mut self, marker: &MarkerDescriptor) -> Result<(), SurfaceError> {
            if marker.radius > 100.0 {
                return Err(SurfaceError::Radius(marker.radius));
            }
            self.drawn.push(marker.radius);
            Ok(())
        }

        fn render_legend_entries(&mut self, entries: &[LegendEntry]) {
            self.legend_rows = entries.len();
        }
    }

    #[test]
    fn failed_marker_does_not_stop_the_rest() {
        let legend = build_legend(&DepthClassifier::default());
        let mut surface = Recording::default();
        let failed = draw(&mut surface, &[marker(1.0, 5.0), marker(2.0, 500.0), marker(3.0, 7.0)], &legend);
        assert_eq!(failed, 1);
        assert_eq!(surface.drawn, vec![5.0, 7.0]);
        assert_eq!(surface.legend_rows, 6);
    }

    #[test]
    fn layer_emits_point_features() {
        let mut layer = MapLayer::new();
        let failed = draw(&mut layer, &[marker(-33.4, 11.0)], &[]);
        assert_eq!(failed, 0);
        assert_eq!(layer.len(), 1);

        let collection = layer.feature_collection();
        let feature = &collection["features"][0];
        assert_eq!(collection["type"], "FeatureCollection");
        assert_eq!(feature["geometry"]["coordinates"][0], -70.5);
        assert_eq!(feature["geometry"]["coordinates"][1], -33.4);
        assert_eq!(feature["properties"]["fillColor"], "#BC0000");
        assert_eq!(feature["properties"]["radius"], 11.0);
    }

    #[test]
    fn layer_refuses_undrawable_markers() {
        let mut layer = MapLayer::new();
        assert!(matches!(layer.add_marker(&marker(f64::NAN, 1.0)), Err(SurfaceError::Position { .. })));
        assert!(matches!(layer.add_marker(&marker(1.0, f64::INFINITY)), Err(SurfaceError::Radius(_))));
        assert!(layer.is_empty());
    }

    #[test]
    fn layer_keeps_legend() {
        let legend = build_legend(&DepthClassifier::default());
        let mut layer = MapLayer::new();
        draw(&mut layer, &[], &legend);
        assert_eq!(layer.legend(), legend.as_slice());
    }
}
