use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use stats_application::commands::identity_commands;
use stats_application::queries::identity_queries::{self, IdentityView};
use stats_application::AppState;
use stats_domain::IdentityRegistration;

use crate::error::HttpError;
use crate::middleware::authorize;

#[derive(Serialize)]
pub struct Registered {
    status: &'static str,
    guid: String,
    smf_id: i64,
}

pub async fn get_identity(
    State(state): State<AppState>,
    Path(guid): Path<String>,
) -> Result<Json<IdentityView>, HttpError> {
    let view = identity_queries::resolve_identity(&state, &guid).await?;
    Ok(Json(view))
}

pub async fn register_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdentityRegistration>,
) -> Result<Json<Registered>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let guid = payload.guid.trim().to_string();
    let smf_id = payload.smf_id;
    identity_commands::register_identity(&state, payload).await?;
    Ok(Json(Registered {
        status: "registered",
        guid,
        smf_id,
    }))
}
