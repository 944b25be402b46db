use serde::Serialize;
use stats_domain::RawEvent;
use tracing::debug;

use crate::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct EventAccepted {
    pub status: &'static str,
    #[serde(rename = "type")]
    pub event_type: String,
}

/// Validates and hands one event to the ingestion queue.
pub fn submit_event(state: &AppState, event: RawEvent) -> Result<EventAccepted, AppError> {
    if event.event_type.is_empty() {
        return Err(AppError::BadRequest("missing event type".to_string()));
    }
    if event.requires_match_id() && event.match_id.trim().is_empty() {
        return Err(AppError::BadRequest(format!(
            "event type {} requires match_id",
            event.event_type
        )));
    }

    let event_type = event.event_type.as_str().to_string();
    if !event.event_type.is_known() {
        debug!(event_type = %event_type, "accepting unknown event type");
    }

    if !state.queue.enqueue(event) {
        return Err(AppError::Overloaded);
    }

    Ok(EventAccepted {
        status: "accepted",
        event_type,
    })
}
