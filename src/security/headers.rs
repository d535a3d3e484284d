//! Embedding and cross-origin isolation headers.
//!
//! # Responsibilities
//! - Derive the fixed response header set from the embed allow-list
//! - Apply it to every HTTP response, whatever the status
//!
//! # Design Decisions
//! - The header set is computed once at startup; applying it cannot fail
//! - Applied by the outermost layer of the HTTP stack and with `insert`,
//!   so nothing closer to the handler can override or drop it

use axum::extract::State;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_SECURITY_POLICY, X_FRAME_OPTIONS};
use axum::response::Response;
use std::sync::Arc;

/// `Cross-Origin-Opener-Policy` header name.
pub const CROSS_ORIGIN_OPENER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-opener-policy");

/// `Cross-Origin-Embedder-Policy` header name.
pub const CROSS_ORIGIN_EMBEDDER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-embedder-policy");

/// Error building a policy from origins that cannot appear in a header.
#[derive(Debug, thiserror::Error)]
#[error("embed origin {origin:?} cannot be used in a response header")]
pub struct InvalidOrigin {
    pub origin: String,
}

/// The response header set enforced on every HTTP response.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    headers: HeaderMap,
}

impl HeaderPolicy {
    /// Build the policy for an ordered embed allow-list.
    ///
    /// An empty list denies framing entirely. Origins are expected to have
    /// passed config validation; anything that still is not a legal header
    /// value is rejected here.
    pub fn from_origins<S: AsRef<str>>(origins: &[S]) -> Result<Self, InvalidOrigin> {
        let (frame_ancestors, frame_options) = match origins.first() {
            None => ("frame-ancestors 'none';".to_string(), "DENY".to_string()),
            Some(first) => {
                let list = origins
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<_>>()
                    .join(" ");
                (
                    format!("frame-ancestors {};", list),
                    format!("ALLOW-FROM {}", first.as_ref()),
                )
            }
        };

        let invalid = || InvalidOrigin {
            origin: origins
                .iter()
                .map(AsRef::as_ref)
                .find(|o| HeaderValue::from_str(o).is_err())
                .unwrap_or_default()
                .to_string(),
        };

        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_str(&frame_ancestors).map_err(|_| invalid())?,
        );
        headers.insert(
            X_FRAME_OPTIONS,
            HeaderValue::from_str(&frame_options).map_err(|_| invalid())?,
        );
        headers.insert(CROSS_ORIGIN_OPENER_POLICY, HeaderValue::from_static("same-origin"));
        headers.insert(CROSS_ORIGIN_EMBEDDER_POLICY, HeaderValue::from_static("require-corp"));

        Ok(Self { headers })
    }

    /// The headers this policy injects.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Overwrite the policy headers in `target`.
    pub fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            target.insert(name.clone(), value.clone());
        }
    }
}

/// Response mapper installed with `axum::middleware::map_response_with_state`.
pub async fn enforce_policy(
    State(policy): State<Arc<HeaderPolicy>>,
    mut response: Response,
) -> Response {
    policy.apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(policy: &'a HeaderPolicy, name: &HeaderName) -> &'a str {
        policy.headers().get(name).unwrap().to_str().unwrap()
    }

    #[test]
    fn test_single_origin() {
        let policy = HeaderPolicy::from_origins(&["https://sites.google.com"]).unwrap();
        assert_eq!(
            header(&policy, &CONTENT_SECURITY_POLICY),
            "frame-ancestors https://sites.google.com;"
        );
        assert_eq!(
            header(&policy, &X_FRAME_OPTIONS),
            "ALLOW-FROM https://sites.google.com"
        );
        assert_eq!(header(&policy, &CROSS_ORIGIN_OPENER_POLICY), "same-origin");
        assert_eq!(header(&policy, &CROSS_ORIGIN_EMBEDDER_POLICY), "require-corp");
        assert_eq!(policy.headers().len(), 4);
    }

    #[test]
    fn test_multiple_origins_keep_order() {
        let policy =
            HeaderPolicy::from_origins(&["https://b.example", "https://a.example"]).unwrap();
        assert_eq!(
            header(&policy, &CONTENT_SECURITY_POLICY),
            "frame-ancestors https://b.example https://a.example;"
        );
        assert_eq!(header(&policy, &X_FRAME_OPTIONS), "ALLOW-FROM https://b.example");
    }

    #[test]
    fn test_empty_allow_list_denies_framing() {
        let policy = HeaderPolicy::from_origins::<&str>(&[]).unwrap();
        assert_eq!(header(&policy, &CONTENT_SECURITY_POLICY), "frame-ancestors 'none';");
        assert_eq!(header(&policy, &X_FRAME_OPTIONS), "DENY");
    }

    #[test]
    fn test_apply_overrides_existing_values() {
        let policy = HeaderPolicy::from_origins(&["https://sites.google.com"]).unwrap();
        let mut target = HeaderMap::new();
        target.insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
        target.append(CONTENT_SECURITY_POLICY, HeaderValue::from_static("default-src *"));
        target.append(CONTENT_SECURITY_POLICY, HeaderValue::from_static("frame-ancestors *"));

        policy.apply(&mut target);

        assert_eq!(target.get_all(CONTENT_SECURITY_POLICY).iter().count(), 1);
        assert_eq!(target.get(X_FRAME_OPTIONS).unwrap(), "ALLOW-FROM https://sites.google.com");
    }

    #[test]
    fn test_control_characters_rejected() {
        let err = HeaderPolicy::from_origins(&["https://ok.example", "https://bad\n.example"])
            .unwrap_err();
        assert_eq!(err.origin, "https://bad\n.example");
    }
}
