use serde::Serialize;
use stats_domain::IdentityInfo;

use crate::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct IdentityView {
    pub guid: String,
    pub smf_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<IdentityInfo>,
    pub aliases: Vec<String>,
}

pub async fn resolve_identity(state: &AppState, guid: &str) -> Result<IdentityView, AppError> {
    let guid = guid.trim();
    if guid.is_empty() {
        return Err(AppError::BadRequest("guid is required".to_string()));
    }

    let smf_id = state.identity.resolve(guid).await?;
    let info = state.identity.identity_info(guid).await?;
    let aliases = state.identity.aliases(guid).await?;

    Ok(IdentityView {
        guid: guid.to_string(),
        smf_id,
        info,
        aliases,
    })
}
