use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::depth::{BUCKET_COUNT, DEFAULT_PALETTE};

const CONFIG_PATHS: [&str; 2] = ["quakemap.toml", "quakemap.example.toml"];

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub thread_count: Option<usize>,
    pub template_dir: PathBuf,
    pub feed: FeedConfig,
    pub palette: [String; BUCKET_COUNT],
    pub map: MapConfig,
    pub tiles: TileConfig,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub retries: u32,
    pub retry_backoff_ms: u64,
}

/// Initial view and circle-marker styling handed to the page.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct MapConfig {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
    pub stroke_color: String,
    pub stroke_weight: f64,
    pub stroke_opacity: f64,
    pub fill_opacity: f64,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TileConfig {
    /// Upstream url with `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    pub attribution: String,
    pub cache_dir: PathBuf,
    pub cache_size_mb: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".to_string(),
            thread_count: None,
            template_dir: PathBuf::from("data/templates"),
            feed: FeedConfig::default(),
            palette: DEFAULT_PALETTE.map(String::from),
            map: MapConfig::default(),
            tiles: TileConfig::default(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_week.geojson".to_string(),
            timeout_secs: 10,
            retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: 37.0902,
            center_lon: -95.7129,
            zoom: 5,
            stroke_color: "gray".to_string(),
            stroke_weight: 1.0,
            stroke_opacity: 0.8,
            fill_opacity: 0.35,
        }
    }
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors".to_string(),
            cache_dir: PathBuf::from("data/cache"),
            cache_size_mb: 512,
        }
    }
}

impl TileConfig {
    pub fn cache_size_bytes(&self) -> u64 {
        self.cache_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let Some(path) = CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) else {
            info!("no configuration file found, using defaults");
            return Ok(Self::default());
        };

        info!("loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.feed.url)
            .map_err(|e| anyhow::anyhow!("invalid feed url '{}': {}", self.feed.url, e))?;
        if self.thread_count == Some(0) {
            return Err(anyhow::anyhow!("thread_count must be greater than zero"));
        }
        if self.feed.timeout_secs == 0 {
            return Err(anyhow::anyhow!("feed.timeout_secs must be greater than zero"));
        }
        if let Some(i) = self.palette.iter().position(|c| c.trim().is_empty()) {
            return Err(anyhow::anyhow!("palette color {} is empty", i));
        }
        if self.map.zoom > 22 {
            return Err(anyhow::anyhow!("map.zoom {} is out of range (0-22)", self.map.zoom));
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.tiles.url_template.contains(placeholder) {
                return Err(anyhow::anyhow!("tiles.url_template is missing {}", placeholder));
            }
        }
        Ok(())
    }
}
