//! Default pairing agent served over D-Bus.
//!
//! bluer derives the advertised IO capability from the callbacks set on the
//! [`Agent`]: none at all is `NoInputNoOutput`, an auto-accepting
//! confirmation callback is `DisplayYesNo`.

use bluer::agent::{Agent, ReqResult, RequestAuthorization, RequestConfirmation};

use crate::error::BluezError;

async fn accept_confirmation(request: RequestConfirmation) -> ReqResult<()> {
    tracing::info!(device = %request.device, passkey = request.passkey, "auto-confirming pairing");
    Ok(())
}

async fn accept_authorization(request: RequestAuthorization) -> ReqResult<()> {
    tracing::info!(device = %request.device, "auto-authorizing pairing");
    Ok(())
}

/// Build the agent for `capability`.
pub(crate) fn agent_for(capability: &str) -> Result<Agent, BluezError> {
    match capability.trim().to_ascii_lowercase().as_str() {
        "noinputnooutput" => Ok(Agent {
            request_default: true,
            ..Default::default()
        }),
        "displayyesno" => Ok(Agent {
            request_default: true,
            request_confirmation: Some(Box::new(|req| Box::pin(accept_confirmation(req)))),
            request_authorization: Some(Box::new(|req| Box::pin(accept_authorization(req)))),
            ..Default::default()
        }),
        _ => Err(BluezError::UnsupportedCapability(capability.to_string())),
    }
}

/// `bluetoothctl` script registering a default agent, for hosts where the
/// D-Bus agent cannot be used.
pub(crate) fn agent_script(capability: &str) -> String {
    format!("agent {capability}\ndefault-agent\nquit\n")
}
