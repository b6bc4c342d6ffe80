use axum::response::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
}

/// Liveness only. The model is loaded before the listener exists, so a
/// responding process always has one.
pub async fn healthcheck() -> Json<Health> {
    Json(Health {
        status: "Available",
    })
}
