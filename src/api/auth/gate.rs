//! Boundary between the gateway client and the handlers.
//!
//! The client signals failure both through errors and through `success`
//! flags; everything past this module only sees `Result<_, AuthError>`.

use tracing::{debug, warn};

use super::AuthError;
use crate::gateway::GatewayClient;

/// Decrypt and verify a callback payload, returning the verified user id.
///
/// # Errors
/// - `MissingPayload` when the payload is absent or empty
/// - `PayloadDecrypt` when decryption or verification errors
/// - `VerificationFailed` when the gateway rejects the payload
pub fn authenticate_payload(
    client: &dyn GatewayClient,
    payload: Option<&str>,
) -> Result<String, AuthError> {
    let payload = payload
        .filter(|payload| !payload.is_empty())
        .ok_or(AuthError::MissingPayload)?;

    let verdict = client
        .decrypt_payload(payload)
        .and_then(|decrypted| client.verify_payload(&decrypted))
        .map_err(AuthError::PayloadDecrypt)?;

    if !verdict.success || verdict.user_id.is_empty() {
        return Err(AuthError::VerificationFailed);
    }

    Ok(verdict.user_id)
}

/// Look up the username for `user_id`. A lookup the gateway answers with
/// `success=false` yields `Ok(None)`.
///
/// # Errors
/// Returns `UpstreamLookup` when the gateway cannot be reached.
pub async fn fetch_username(
    client: &dyn GatewayClient,
    user_id: &str,
) -> Result<Option<String>, AuthError> {
    let data = client
        .get_user_data(user_id)
        .await
        .map_err(AuthError::UpstreamLookup)?;

    if !data.success {
        debug!("gateway has no user data");
    }

    Ok(data.username().map(str::to_string))
}

/// Username for caching in the session; lookup failures leave it absent.
pub async fn cached_username(client: &dyn GatewayClient, user_id: &str) -> Option<String> {
    match fetch_username(client, user_id).await {
        Ok(username) => username,
        Err(err) => {
            warn!(error = ?err, "username lookup failed");
            None
        }
    }
}
