use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use yolo_core::error::{ErrorKind, YoloError};

/// Private sentinel carrying an explicit 404 through the `anyhow::Error`
/// chain.
#[derive(Debug)]
struct NotFoundError(String);

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotFoundError {}

/// Unified error type for HTTP responses: `{"error": "<message>"}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(NotFoundError(msg.into()).into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(YoloError::Usage(msg.into()).into())
    }
}

fn status_of(e: &YoloError) -> StatusCode {
    if matches!(e, YoloError::ItemNotFound(_)) {
        return StatusCode::NOT_FOUND;
    }
    match e.kind() {
        ErrorKind::User | ErrorKind::Logic => StatusCode::BAD_REQUEST,
        ErrorKind::Configuration
        | ErrorKind::Transport
        | ErrorKind::Shape
        | ErrorKind::Filesystem => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<NotFoundError>().is_some() {
            StatusCode::NOT_FOUND
        } else if let Some(e) = self.0.downcast_ref::<YoloError>() {
            status_of(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_not_found_maps_to_404() {
        let err = AppError(YoloError::ItemNotFound("E001".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn not_found_constructor_maps_to_404() {
        let err = AppError::not_found("node 'epic-9' not found");
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn logic_and_user_errors_map_to_400() {
        let err = AppError(YoloError::DependencyCycle("E001 -> E002 -> E001".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::bad_request("bad path").into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn io_error_maps_to_500() {
        let err = AppError(YoloError::Io(std::io::Error::other("disk full")).into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn foreign_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
