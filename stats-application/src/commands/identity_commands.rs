use stats_domain::IdentityRegistration;

use crate::AppError;
use crate::AppState;

pub async fn register_identity(
    state: &AppState,
    registration: IdentityRegistration,
) -> Result<(), AppError> {
    state
        .identity
        .register(&registration.guid, registration.smf_id, &registration.player_name)
        .await?;
    Ok(())
}
