use crate::error::AppError;
use crate::graph::{GraphLink, GraphNode};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;

/// GET /api/nodes
pub async fn list_nodes(State(app): State<AppState>) -> Json<Vec<GraphNode>> {
    let graph = app.graph.read().await;
    Json(graph.nodes().cloned().collect())
}

/// GET /api/node/{id}: accepts `epic-1` or `E001`.
pub async fn get_node(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GraphNode>, AppError> {
    let graph = app.graph.read().await;
    graph
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("node '{id}' not found")))
}

/// GET /api/links
pub async fn list_links(State(app): State<AppState>) -> Json<Vec<GraphLink>> {
    let graph = app.graph.read().await;
    Json(graph.links())
}
