use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ServiceError;
use crate::pipeline::FeedService;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml";
pub const CACHE_HEADER: &str = "x-feed-cache";

#[derive(Clone)]
pub struct AppState {
    pub feeds: Arc<FeedService>,
}

impl AppState {
    pub fn new(feeds: FeedService) -> Self {
        Self {
            feeds: Arc::new(feeds),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/create", post(create_feed))
        .route("/edit", post(edit_feed))
        .route("/feed/{file}", get(get_feed))
        .route("/api/feeds/{id}", get(get_definition))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
  <head><title>RSS Aggregator</title></head>
  <body>
    <h1>RSS Aggregator</h1>
    <h2>Already have a feed?</h2>
    <form action="/edit" method="POST">
      <label>Feed Id <input type="text" name="id" /></label>
      <button type="submit">Edit</button>
    </form>
    <h2>Create a new aggregate feed</h2>
    <p>One RSS feed URL per line. Each source is cached for up to one hour.</p>
    <form action="/create" method="POST">
      <textarea name="feeds" rows="8" cols="80"></textarea><br/>
      <button type="submit">Create</button>
    </form>
  </body>
</html>
"#;

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(serde::Deserialize)]
struct CreateForm {
    #[serde(default)]
    feeds: Option<String>,
}

#[derive(serde::Deserialize)]
struct EditForm {
    #[serde(default)]
    id: Option<String>,
}

#[derive(serde::Serialize)]
struct DefinitionOut {
    id: String,
    sources: Vec<String>,
    feed_url: String,
}

/// 302 to `location`.
fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(v) => (StatusCode::FOUND, [(header::LOCATION, v)]).into_response(),
        Err(_) => (StatusCode::FOUND, [(header::LOCATION, HeaderValue::from_static("/"))])
            .into_response(),
    }
}

async fn create_feed(
    State(state): State<AppState>,
    form: Result<Form<CreateForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let raw = match form {
        Ok(Form(CreateForm { feeds: Some(f) })) if !f.trim().is_empty() => f,
        _ => return Ok(found("/")),
    };
    let def = state.feeds.create_feed(&raw).await?;
    Ok(found(&format!("/feed/{}.xml", def.id)))
}

async fn edit_feed(
    State(state): State<AppState>,
    form: Result<Form<EditForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let id = match form {
        Ok(Form(EditForm { id: Some(id) })) if !id.trim().is_empty() => id.trim().to_string(),
        _ => return Ok(found("/")),
    };
    match state.feeds.definition(&id).await {
        Ok(def) => {
            let mut body = format!("Feed {} ({})\n", def.id, state.feeds.feed_url(&def.id));
            for s in &def.sources {
                body.push_str(s);
                body.push('\n');
            }
            Ok(body.into_response())
        }
        Err(ServiceError::NotFound(_)) => Ok(found("/")),
        Err(e) => Err(e.into()),
    }
}

async fn get_feed(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let id = file.strip_suffix(".xml").unwrap_or(&file);
    if id.is_empty() {
        return Ok(found("/"));
    }
    let rendered = state.feeds.render(id).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, RSS_CONTENT_TYPE),
            (header::HeaderName::from_static(CACHE_HEADER), rendered.cache.as_header()),
        ],
        rendered.xml,
    )
        .into_response())
}

async fn get_definition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DefinitionOut>, ApiError> {
    let def = state.feeds.definition(&id).await?;
    let feed_url = state.feeds.feed_url(&def.id);
    Ok(Json(DefinitionOut {
        id: def.id,
        sources: def.sources,
        feed_url,
    }))
}

/// HTTP mapping of pipeline errors. Bodies are stable so clients can match on `error`.
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ServiceError::InvalidInput(_) => found("/"),
            ServiceError::Build(e) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "build_failed",
                    "source": e.url,
                    "detail": e.cause.to_string(),
                })),
            )
                .into_response(),
            ServiceError::IdSpaceExhausted(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "id_space_exhausted" })),
            )
                .into_response(),
            ServiceError::Store(e) => {
                tracing::error!(target: "api", error = %e, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "storage" })),
                )
                    .into_response()
            }
        }
    }
}
