use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::path::{Component, Path, PathBuf};

/// Explicit types for the graph UI's own files; everything else is guessed.
fn content_type(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("css") => "text/css".to_string(),
        Some("js") => "application/javascript".to_string(),
        Some("html") => "text/html".to_string(),
        _ => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// `None` when the request path tries to leave the static directory.
fn resolve(dir: &Path, request: &str) -> Option<PathBuf> {
    let relative = Path::new(request.trim_start_matches('/'));
    let mut out = dir.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

async fn file_response(path: &Path) -> Option<Response> {
    let bytes = tokio::fs::read(path).await.ok()?;
    Some(
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type(path))],
            bytes,
        )
            .into_response(),
    )
}

/// Serve the graph UI from the configured directory. Unknown paths fall
/// back to `index.html`.
pub async fn static_handler(State(state): State<AppState>, uri: Uri) -> Result<Response, AppError> {
    let Some(dir) = state.static_dir.as_deref() else {
        return Err(AppError::not_found("no graph UI directory configured"));
    };
    let path = resolve(dir, uri.path())
        .ok_or_else(|| AppError::bad_request(format!("invalid path '{}'", uri.path())))?;

    if path.is_file() {
        if let Some(response) = file_response(&path).await {
            return Ok(response);
        }
    }
    match file_response(&dir.join("index.html")).await {
        Some(response) => Ok(response),
        None => Err(AppError::not_found(format!("{} not found", uri.path()))),
    }
}
