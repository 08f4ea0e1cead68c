//! Browser front-end: one page with an id input, a heading and an image, plus
//! the small JSON API the page polls.
//!
//! Each request runs fetch -> blob -> display once and keeps no state; the
//! page tags every request with its id and ignores answers that arrive after
//! the input has moved on.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::blob::{fetch_blob, DisplayFields};
use crate::config::Config;
use crate::error::ApiError;
use crate::fetch::PokemonSource;

#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn PokemonSource>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(source: Arc<dyn PokemonSource>, config: Config) -> Self {
        Self {
            source,
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(data: Option<T>, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data,
            error: Some(error.into()),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/pokemon/{id}", get(get_display))
        .route("/api/blob/{id}", get(get_blob))
        .with_state(state)
}

/// Bind `config.bind_addr()` and serve until the listener fails.
pub async fn serve(config: Config, source: Arc<dyn PokemonSource>) -> std::io::Result<()> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}", addr);
    axum::serve(listener, build_router(AppState::new(source, config))).await
}

fn error_status(err: &ApiError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_GATEWAY
    }
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let cfg = &state.config;
    Html(
        INDEX_HTML
            .replace("{{MIN_ID}}", &cfg.min_id.to_string())
            .replace("{{MAX_ID}}", &cfg.max_id.to_string())
            .replace("{{INITIAL_ID}}", &cfg.initial_id.to_string()),
    )
}

async fn health() -> &'static str {
    "ok"
}

async fn get_display(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> (StatusCode, Json<ApiResponse<DisplayFields>>) {
    match fetch_blob(state.source.as_ref(), id).await {
        Ok(blob) => (
            StatusCode::OK,
            Json(ApiResponse::success(DisplayFields::from_blob(&blob))),
        ),
        Err(err) => {
            tracing::warn!(id, error = %err, "rendering fallback");
            (
                error_status(&err),
                Json(ApiResponse::failure(
                    Some(DisplayFields::fallback(id)),
                    err.to_string(),
                )),
            )
        }
    }
}

async fn get_blob(State(state): State<AppState>, Path(id): Path<u32>) -> Response {
    match fetch_blob(state.source.as_ref(), id).await {
        Ok(blob) => ([(header::CONTENT_TYPE, "application/json")], blob).into_response(),
        Err(err) => (
            error_status(&err),
            Json(ApiResponse::<()>::failure(None, err.to_string())),
        )
            .into_response(),
    }
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>pokeview</title>
<style>
  body { font-family: sans-serif; margin: 2rem; }
  #pokemon-image { image-rendering: pixelated; width: 192px; height: 192px; }
  #pokemon-error { color: #b00; }
</style>
</head>
<body>
<h1 id="pokemon-name"></h1>
<input id="pokemon-id" type="number" min="{{MIN_ID}}" max="{{MAX_ID}}" value="{{INITIAL_ID}}">
<div><img id="pokemon-image" alt="" hidden></div>
<p id="pokemon-error"></p>
<script>
  const input = document.getElementById("pokemon-id");
  const heading = document.getElementById("pokemon-name");
  const image = document.getElementById("pokemon-image");
  const error = document.getElementById("pokemon-error");
  let latest = null;

  function render(data, message) {
    heading.textContent = data ? data.name : "";
    if (data && data.image) {
      image.src = data.image;
      image.hidden = false;
    } else {
      image.removeAttribute("src");
      image.hidden = true;
    }
    error.textContent = message || "";
  }

  async function load() {
    const id = input.value;
    latest = id;
    try {
      const res = await fetch(`/api/pokemon/${id}`);
      const body = await res.json();
      if (id !== latest) return;
      render(body.data, body.error);
    } catch (e) {
      if (id !== latest) return;
      render(null, String(e));
    }
  }

  input.addEventListener("change", load);
  load();
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::Pokemon;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::util::ServiceExt;

    struct Fixture;

    #[async_trait]
    impl PokemonSource for Fixture {
        async fn pokemon(&self, id: u32) -> Result<Pokemon> {
            let mut record: Value =
                serde_json::from_str(include_str!("../tests/fixtures/squirtle.json"))
                    .expect("fixture parses");
            match id {
                7 => {}
                8 => record["sprites"]["front_default"] = Value::Null,
                9 => {
                    record.as_object_mut().unwrap().remove("stats");
                }
                _ => {
                    return Err(ApiError::RemoteRequest {
                        url: format!("http://fixture/pokemon/{}", id),
                        status: Some(404),
                        source: None,
                    })
                }
            }
            Pokemon::from_value(record)
        }

        async fn sprite(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn app() -> Router {
        build_router(AppState::new(Arc::new(Fixture), Config::default()))
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        let res = app().oneshot(req).await.expect("response");
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn display_for_squirtle() {
        let (status, body) = get_json("/api/pokemon/7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["data"]["name"], "Squirtle");
        assert_eq!(body["data"]["stats"]["hp"], 44);
        assert_eq!(body["data"]["stats"]["attack"], 48);
        assert!(body["data"]["image"].as_str().unwrap().ends_with("/7.png"));
    }

    #[tokio::test]
    async fn null_sprite_renders_without_image() {
        let (status, body) = get_json("/api/pokemon/8").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["image"], Value::Null);
        assert_eq!(body["data"]["name"], "Squirtle");
    }

    #[tokio::test]
    async fn missing_stats_renders_fallback() {
        let (status, body) = get_json("/api/pokemon/9").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["ok"], false);
        assert_eq!(body["data"]["name"], "");
        assert_eq!(body["data"]["image"], Value::Null);
        assert!(body["error"].as_str().unwrap().contains("stats"));
    }

    #[tokio::test]
    async fn unknown_id_is_404_with_fallback() {
        let (status, body) = get_json("/api/pokemon/0").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["data"]["id"], 0);
        assert!(body["error"].as_str().unwrap().contains("404"));
    }

    #[tokio::test]
    async fn blob_route_serves_transfer_blob() {
        let (status, body) = get_json("/api/blob/7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 7);
        assert_eq!(body["name"], "squirtle");
        assert_eq!(body["stats"]["special-defense"], 64);
    }

    #[tokio::test]
    async fn index_page_carries_id_bounds() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains(r#"min="1" max="151" value="7""#));
        assert!(html.contains(r#"id="pokemon-name""#));
    }

    #[tokio::test]
    async fn index_page_starts_inside_a_narrow_range() {
        let mut config = Config {
            max_id: 5,
            ..Config::default()
        };
        config.initial_id = config.clamp_id(config.initial_id);
        let app = build_router(AppState::new(Arc::new(Fixture), config));

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains(r#"min="1" max="5" value="5""#));
    }
}
