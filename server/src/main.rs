use axum::{
    extract::Query,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use dropfour::{best_move, MoveRequest};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
/// Deepest search a single request may ask for.
const MAX_HTTP_DEPTH: u8 = 6;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let app = app_router();

    let addr = std::env::var("DROPFOUR_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn app_router() -> Router {
    let api = Router::new().route("/move", get(handle_move));
    Router::new()
        .nest("/api", api)
        .layer(
            CorsLayer::new()
                .allow_methods([axum::http::Method::GET])
                .allow_origin(axum::http::HeaderValue::from_static("*"))
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
}

async fn handle_move(Query(req): Query<MoveRequest>) -> Result<impl IntoResponse, ApiError> {
    if req.depth > MAX_HTTP_DEPTH {
        return Err(anyhow::anyhow!(
            "depth {} exceeds the limit of {} for this endpoint",
            req.depth,
            MAX_HTTP_DEPTH
        )
        .into());
    }
    // search is CPU bound
    let mv = tokio::task::spawn_blocking(move || best_move(req)).await??;
    info!(column = mv.column, piece = %mv.piece, "move chosen");
    let headers = [(header::CACHE_CONTROL, "no-store")];
    Ok((headers, Json(mv)))
}

#[derive(Debug)]
struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::BAD_REQUEST;
        let body = format!("{}", self.0);
        (status, body).into_response()
    }
}
