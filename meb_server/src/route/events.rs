use std::{io::ErrorKind, sync::Arc};

use axum::{
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
};
use tokio::fs;
use tracing::warn;

use crate::AppState;

/// Handle events file requests.
///
/// The file is read on every request and must not be cached.
pub async fn handler(State(state): State<Arc<AppState>>) -> Result<Response, (StatusCode, String)> {
    let events = fs::read_to_string(&state.events_path)
        .await
        .map_err(|err| match err.kind() {
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, String::from("no events yet")),
            _ => {
                warn!(path = %state.events_path.display(), error = %err, "failed to read events");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        })?;
    let response = (
        [(CONTENT_TYPE, "application/json"), (CACHE_CONTROL, "no-store")],
        events,
    )
        .into_response();
    Ok(response)
}
