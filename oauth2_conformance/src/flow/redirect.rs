use http::StatusCode;
use url::{ParseError, Url};

use crate::session::{RedirectMode, Session};

use super::errors::ConformanceError;
use super::types::FlowResponse;

/// Resolves a `Location` value seen on a response to `previous`.
///
/// Absolute targets are taken as-is. Relative targets resolve against the
/// origin of `previous`, not its path.
pub(crate) fn resolve_target(previous: &Url, location: &str) -> Result<Url, ConformanceError> {
    let invalid = |reason: String| ConformanceError::InvalidRedirectTarget {
        location: location.to_string(),
        reason,
    };

    match Url::parse(location) {
        Ok(url) => Ok(url),
        Err(ParseError::RelativeUrlWithoutBase) => {
            let mut origin = previous.clone();
            origin.set_path("/");
            origin.set_query(None);
            origin.set_fragment(None);
            origin.join(location).map_err(|e| invalid(e.to_string()))
        }
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// Only 200 and 302 are legal along the redirect chain.
pub(crate) fn ensure_walkable_status(response: &FlowResponse) -> Result<(), ConformanceError> {
    match response.status {
        StatusCode::OK | StatusCode::FOUND => Ok(()),
        status => {
            tracing::error!("Unexpected status {} from {}", status, response.url);
            Err(ConformanceError::UnexpectedStatus {
                url: response.url.clone(),
                status,
            })
        }
    }
}

/// Follows the redirect carried by `response` exactly one hop.
pub async fn follow_redirect(
    response: &FlowResponse,
    session: &Session,
) -> Result<FlowResponse, ConformanceError> {
    if session.redirect_mode() != RedirectMode::Manual {
        return Err(ConformanceError::Config(
            "redirect walking requires a session in manual redirect mode".to_string(),
        ));
    }

    let target = response
        .location
        .clone()
        .ok_or_else(|| ConformanceError::MissingRedirectTarget(response.url.clone()))?;

    let hop = session.record_hop();
    if hop > session.max_redirect_hops() {
        tracing::error!(
            "Redirect hop {} for {} exceeds limit {}",
            hop,
            session.username(),
            session.max_redirect_hops()
        );
        return Err(ConformanceError::TooManyRedirects {
            limit: session.max_redirect_hops(),
        });
    }

    tracing::debug!("Hop {} for {}: GET {}", hop, session.username(), target);
    let next = session.client().get(target).send().await?;
    let next = FlowResponse::from_response(next).await?;
    ensure_walkable_status(&next)?;

    tracing::debug!(
        "Hop {} returned {} (location: {:?})",
        hop,
        next.status,
        next.location.as_ref().map(|u| u.as_str())
    );
    Ok(next)
}
