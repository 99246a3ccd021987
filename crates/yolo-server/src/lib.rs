//! `yolo-server`: read-only HTTP view of the work-item graph.

pub mod error;
pub mod graph;
pub mod hub;
pub mod routes;
pub mod state;
pub mod static_files;

use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/nodes", get(routes::graph::list_nodes))
        .route("/api/node/{id}", get(routes::graph::get_node))
        .route("/api/links", get(routes::graph::list_links))
        .route("/api/ws", get(routes::ws::ws_handler))
        .fallback(static_files::static_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Load the graph under `root` and serve it on `port` until the process is
/// stopped.
pub async fn serve(
    root: PathBuf,
    static_dir: Option<PathBuf>,
    port: u16,
    open_browser: bool,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(root, static_dir, listener, open_browser).await
}

/// Like [`serve`], on a pre-bound listener (port 0 lets the OS pick).
pub async fn serve_on(
    root: PathBuf,
    static_dir: Option<PathBuf>,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let app_state = state::AppState::load(&root, static_dir)?;
    let nodes = app_state.graph.read().await.len();
    let app = build_router(app_state);
    let port = listener.local_addr()?.port();
    let url = format!("http://localhost:{port}");
    tracing::info!(%url, nodes, "graph server listening");

    if open_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "could not open browser");
        }
    }

    axum::serve(listener, app).await?;
    Ok(())
}
