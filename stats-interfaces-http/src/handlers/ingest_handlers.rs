use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::{debug, warn};

use stats_application::commands::ingest_commands::{self, EventAccepted};
use stats_application::AppState;

use crate::error::HttpError;
use crate::middleware::{authorize_server, parse_event};

pub async fn ingest_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<(StatusCode, Json<EventAccepted>), HttpError> {
    let event = parse_event(&headers, &body).await.map_err(|err| {
        debug!(error = %err, "failed to parse ingest body");
        HttpError::BadRequest(format!("invalid event body: {}", err))
    })?;

    if !authorize_server(&state.config, &headers, &event) {
        warn!(server_id = %event.server_id, "rejected event with invalid server token");
        return Err(HttpError::Unauthorized);
    }

    let accepted = ingest_commands::submit_event(&state, event)?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}
