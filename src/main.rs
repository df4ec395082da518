use axum::{
    extract::{Path, State},
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

mod config;
mod depth;
mod error;
mod feed;
mod legend;
mod models;
mod pipeline;
mod renderer;
mod surface;
mod template_engine;
mod tile_cache;
mod utils;

use config::Config;
use depth::DepthClassifier;
use error::AppError;
use feed::{FeedSource, UsgsFeed};
use legend::{build_legend, LegendEntry};
use pipeline::render_pass;
use renderer::{FeatureRenderer, RenderPass};
use surface::{draw, MapLayer};
use template_engine::{TemplateEngine, MAP_PAGE};
use tile_cache::{TileCache, TileKey};
use utils::fill_tile_url;

const USER_AGENT: &str = concat!("quakemap/", env!("CARGO_PKG_VERSION"));
const LOCAL_TILE_URL: &str = "/tiles/{z}/{x}/{y}";

struct AppState {
    config: Config,
    template_engine: TemplateEngine,
    http_client: reqwest::Client,
    feed: Box<dyn FeedSource>,
    renderer: FeatureRenderer,
    legend: Vec<LegendEntry>,
    tile_cache: TileCache,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let config = Config::load()?;
    let thread_count = config.thread_count.unwrap_or_else(num_cpus::get);

    info!("starting quakemap with {} threads", thread_count);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(thread_count)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn log_request_response(req: Request<axum::body::Body>, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().to_string();
    info!("incoming request: {} {}", method, path);
    let response = next.run(req).await;
    info!("request result: {} for {} {}", response.status(), method, path);
    response
}

async fn async_main(config: Config) -> anyhow::Result<()> {
    let template_engine = TemplateEngine::new(&config.template_dir)?;
    let http_client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    let feed = UsgsFeed::new(http_client.clone(), &config.feed);
    info!("earthquake feed: {}", feed.url());

    let tile_cache = TileCache::open(config.tiles.cache_dir.clone(), config.tiles.cache_size_bytes()).await?;

    let renderer = FeatureRenderer::new(DepthClassifier::new(config.palette.clone()));
    let legend = build_legend(renderer.classifier());
    info!("depth palette: {:?}", renderer.classifier().palette());

    let addr = config.listen_addr.clone();
    let state = Arc::new(AppState {
        config,
        template_engine,
        http_client,
        feed: Box::new(feed),
        renderer,
        legend,
        tile_cache,
    });

    info!("listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(map_page))
        .route("/api/markers", get(markers))
        .route("/api/markers.geojson", get(markers_geojson))
        .route("/api/legend", get(legend))
        .route("/tiles/{z}/{x}/{y}", get(proxy_tile))
        .layer(middleware::from_fn(log_request_response))
        .with_state(state)
}

// --- Handlers ---

async fn map_page(State(state): State<Arc<AppState>>) -> Response {
    let mut layer = MapLayer::new();
    let (status, skipped, feed_error) = match render_pass(state.feed.as_ref(), &state.renderer).await {
        Ok(pass) => {
            let failed = draw(&mut layer, &pass.markers, &state.legend);
            (StatusCode::OK, pass.skipped.len() + failed, None)
        }
        Err(e) => {
            draw(&mut layer, &[], &state.legend);
            (StatusCode::BAD_GATEWAY, 0, Some(e.to_string()))
        }
    };

    let mut context = tera::Context::new();
    context.insert("map", &state.config.map);
    context.insert("tile_url", LOCAL_TILE_URL);
    context.insert("attribution", &state.config.tiles.attribution);
    context.insert("legend", layer.legend());
    context.insert("markers_geojson", &layer.feature_collection().to_string());
    context.insert("marker_count", &layer.len());
    context.insert("skipped", &skipped);
    context.insert("feed_error", &feed_error);

    match state.template_engine.render(MAP_PAGE, &context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("map page error: {}", e);
            AppError::Internal(e).into_response()
        }
    }
}

async fn markers(State(state): State<Arc<AppState>>) -> Result<Json<RenderPass>, AppError> {
    let pass = render_pass(state.feed.as_ref(), &state.renderer).await?;
    Ok(Json(pass))
}

async fn markers_geojson(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, AppError> {
    let pass = render_pass(state.feed.as_ref(), &state.renderer).await?;
    let mut layer = MapLayer::new();
    let failed = draw(&mut layer, &pass.markers, &state.legend);
    if layer.is_empty() {
        info!("feed produced no drawable markers");
    }
    info!(
        "geojson layer: {} markers, {} features skipped, {} markers refused",
        layer.len(),
        pass.skipped.len(),
        failed
    );
    Ok(Json(layer.feature_collection()))
}

async fn legend(State(state): State<Arc<AppState>>) -> Json<Vec<LegendEntry>> {
    Json(state.legend.clone())
}

async fn proxy_tile(
    State(state): State<Arc<AppState>>,
    Path((z, x, y)): Path<(u32, u32, u32)>,
) -> Result<Response, AppError> {
    let key = TileKey::new(z, x, y).ok_or_else(|| AppError::NotFound(format!("tile {}/{}/{}", z, x, y)))?;

    match state.tile_cache.get(key).await {
        Ok(Some(tile)) => return Ok(([(header::CONTENT_TYPE, tile.content_type)], tile.bytes).into_response()),
        Ok(None) => {}
        Err(e) => warn!("tile cache read failed for {}/{}/{}: {}", z, x, y, e),
    }

    let url = fill_tile_url(&state.config.tiles.url_template, z, x, y);
    let resp = state
        .http_client
        .get(&url)
        .send()
        .await
        .map_err(|e| AppError::TileUpstream(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(AppError::TileUpstream(format!("{} returned {}", url, status)));
    }
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/png")
        .to_string();
    let bytes = resp.bytes().await.map_err(|e| AppError::TileUpstream(e.to_string()))?;

    if let Err(e) = state.tile_cache.put(key, &content_type, &bytes).await {
        warn!("tile cache write failed for {}/{}/{}: {}", z, x, y, e);
    }
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
