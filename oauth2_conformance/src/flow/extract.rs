use crate::utils::split_scopes;

use super::errors::ConformanceError;
use super::types::{FlowResponse, ProtocolError};

/// Authorization code carried by a terminal response.
///
/// An absent or empty `code` is a protocol violation by the server.
pub fn extract_authorization_code(terminal: &FlowResponse) -> Result<String, ConformanceError> {
    match terminal.query_param("code") {
        Some(code) if !code.is_empty() => Ok(code),
        _ => {
            tracing::error!(
                "No authorization code in terminal response from {} (location: {:?})",
                terminal.url,
                terminal.location.as_ref().map(|u| u.as_str())
            );
            Err(ConformanceError::MissingAuthorizationCode)
        }
    }
}

/// Protocol error carried by a terminal response, if any.
pub fn extract_error(terminal: &FlowResponse) -> Option<ProtocolError> {
    terminal.query_param("error").map(|error| ProtocolError {
        error,
        error_description: terminal.query_param("error_description"),
    })
}

/// Scopes the server reported alongside the code.
///
/// The authorization response is not required to carry `scope`. Without it
/// `requested` is returned, so a later scope check cannot detect narrowing.
pub fn extract_scopes(terminal: &FlowResponse, requested: &[String]) -> Vec<String> {
    match terminal.query_param("scope") {
        Some(scope) => split_scopes(&scope),
        None => {
            tracing::warn!(
                "No scope in terminal response from {}, assuming requested {:?} were granted",
                terminal.url,
                requested
            );
            requested.to_vec()
        }
    }
}
