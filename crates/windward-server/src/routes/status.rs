use axum::response::IntoResponse;
use axum::routing::{Router, get};
use axum::{Extension, Json};
use http::StatusCode;
use sea_orm::DatabaseConnection;
use std::error::Error;
use windward_model::status::Status;

pub(crate) fn create_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/", get(get_status))
}

#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = OK, body = Status, description = "Service is healthy"),
        (status = INTERNAL_SERVER_ERROR, description = "Database unreachable"),
    ),
    tag = "util",
)]
pub(crate) async fn get_status(Extension(conn): Extension<DatabaseConnection>) -> impl IntoResponse {
    match conn.ping().await {
        Ok(()) => (StatusCode::OK, Json(Status { database: "ok" })).into_response(),
        Err(error) => {
            tracing::error!(error = &error as &dyn Error, "database ping failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Status { database: "unreachable" })).into_response()
        }
    }
}
