//! HTTP routes for the web server.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};

use super::assets::{content_type, StaticAssets};
use super::error::ApiError;
use super::card::{render_card, CardView};
use super::templates::{share_url, ShareView, TemplateEngine};
use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::detect::{self, Prediction};
use crate::share::{ShareError, ShareRecord, ShareStore};

/// Shared application state.
pub struct AppState {
    pub store: ShareStore,
    pub template_engine: TemplateEngine,
    /// Base URL for share links. Falls back to the request's Host header.
    pub public_url: Option<String>,
    pub max_body_bytes: usize,
}

impl AppState {
    /// Create state around an existing store with default settings.
    pub fn new(store: ShareStore) -> Result<Self, minijinja::Error> {
        Ok(Self {
            store,
            template_engine: TemplateEngine::new()?,
            public_url: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Set the public base URL used in share links.
    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url.map(|url| url.trim_end_matches('/').to_string());
        self
    }

    /// Set the request body limit.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Base URL for links generated in response to a request.
    fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(ref url) = self.public_url {
            return url.clone();
        }
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        format!("http://{}", host)
    }
}

/// Build the router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/", get(index_handler))
        .route("/share", get(lookup_handler).post(publish_handler))
        .route("/api/share", get(lookup_handler).post(publish_handler))
        .route("/share/:id", get(share_page_handler))
        .route("/share/:id/opengraph-image", get(card_handler))
        .route("/api/detect", post(detect_handler))
        .route("/assets/*path", get(assets_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Body of a publish request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[serde(default)]
    pub image_data: Option<Value>,
    #[serde(default)]
    pub is_hot_dog: Value,
}

/// Body of a successful publish response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub id: String,
    pub share_url: String,
}

/// Pick the share id out of a lookup query string.
///
/// Repeated `id` parameters resolve to the first one.
pub fn first_id(pairs: &[(String, String)]) -> Option<&str> {
    pairs
        .iter()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.as_str())
}

/// Body of a detect request.
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

/// Body of a detect response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub is_hot_dog: bool,
}

/// JavaScript-style truthiness for loosely typed JSON flags.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Handler for publishing a new share.
async fn publish_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Json<PublishResponse>, ApiError> {
    let Json(request) = payload?;

    let image_data = match request.image_data {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => return Err(ShareError::invalid_input("image data is required").into()),
    };
    let is_hot_dog = is_truthy(&request.is_hot_dog);

    let id = state.store.publish(image_data, is_hot_dog)?;
    let share_url = share_url(&state.base_url(&headers), id.as_str());

    info!(share_id = %id, is_hot_dog, "Share published");
    Ok(Json(PublishResponse {
        id: id.to_string(),
        share_url,
    }))
}

/// Handler for looking up a share by `?id=`.
async fn lookup_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<ShareRecord>, ApiError> {
    let Query(pairs) = query.map_err(|e| {
        debug!(error = %e, "Unreadable lookup query");
        ApiError::NotFound
    })?;
    let id = first_id(&pairs).ok_or(ApiError::NotFound)?;
    let record = state.store.lookup(id).map_err(|e| {
        if let ShareError::NotFound(_) = e {
            debug!(share_id = %id, "Share lookup missed");
        }
        ApiError::from(e)
    })?;
    Ok(Json(record))
}

/// Handler for the human-facing share page.
async fn share_page_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let rendered = match state.store.lookup(&id) {
        Ok(record) => {
            let view = ShareView::from_record(&record, &state.base_url(&headers));
            state
                .template_engine
                .render_share(&view)
                .map(|html| (StatusCode::OK, html))
        }
        Err(ShareError::NotFound(_)) => state
            .template_engine
            .render_not_found()
            .map(|html| (StatusCode::NOT_FOUND, html)),
        Err(e) => return ApiError::from(e).into_response(),
    };

    match rendered {
        Ok((status, html)) => (status, Html(html)).into_response(),
        Err(e) => ApiError::Internal(format!("template error: {}", e)).into_response(),
    }
}

/// Handler for the Open Graph preview card.
///
/// Always answers with an image; unknown or expired shares get the generic card.
async fn card_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let card = match state.store.lookup(&id) {
        Ok(record) => CardView::from_record(&record),
        Err(ShareError::NotFound(_)) => CardView::fallback(),
        Err(e) => {
            error!(share_id = %id, error = %e, "Share lookup failed for preview card");
            CardView::fallback()
        }
    };

    match tokio::task::spawn_blocking(move || render_card(&card)).await {
        Ok(Ok(png)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type("card.png"))],
            png,
        )
            .into_response(),
        Ok(Err(e)) => ApiError::Internal(format!("card render error: {}", e)).into_response(),
        Err(e) => ApiError::Internal(format!("card render task failed: {}", e)).into_response(),
    }
}

/// Handler that turns classifier predictions into a verdict.
async fn detect_handler(
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(DetectResponse {
        is_hot_dog: detect::is_hot_dog(&request.predictions),
    }))
}

/// Handler for the detector page.
async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.template_engine.render_index() {
        Ok(html) => Html(html).into_response(),
        Err(e) => ApiError::Internal(format!("template error: {}", e)).into_response(),
    }
}

/// Handler for static assets.
async fn assets_handler(Path(path): Path<String>) -> Response {
    match StaticAssets::get(&path) {
        Some(file) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type(&path))],
            file.data.into_owned(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}
