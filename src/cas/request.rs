//! Per-request accessors.
//!
//! Once `handle` has resolved a session, the identity travels with the
//! request as an [`AuthenticationResponse`] extension. These helpers read it
//! back out, and find or remove the `ticket` query parameter.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Request, StatusCode, Uri},
};

use crate::cas::types::{AuthenticationResponse, Attributes};

/// Name of the query parameter carrying the service ticket.
pub const TICKET_PARAM: &str = "ticket";

/// The identity attached to the request, if any.
pub fn authentication_response<B>(req: &Request<B>) -> Option<&AuthenticationResponse> {
    req.extensions().get::<AuthenticationResponse>()
}

pub fn is_authenticated<B>(req: &Request<B>) -> bool {
    authentication_response(req).is_some()
}

/// Authenticated username.
pub fn username<B>(req: &Request<B>) -> Option<&str> {
    authentication_response(req).map(|resp| resp.user.as_str())
}

/// Released attributes of the authenticated user.
pub fn attributes<B>(req: &Request<B>) -> Option<&Attributes> {
    authentication_response(req).map(|resp| &resp.attributes)
}

/// Non-empty `ticket` query parameter.
pub fn ticket(uri: &Uri) -> Option<String> {
    url::form_urlencoded::parse(uri.query()?.as_bytes())
        .find(|(key, _)| key == TICKET_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Re-encode `query` without any `ticket` parameter, keeping the order of
/// everything else.
pub fn query_without_ticket(query: &str) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key != TICKET_PARAM {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.finish()
}

/// Request path and query with the ticket removed.
pub fn path_without_ticket(uri: &Uri) -> String {
    let query = uri.query().map(query_without_ticket).unwrap_or_default();
    if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    }
}

/// Extractor for handlers that need the authenticated principal.
///
/// Rejects with `401 Unauthorized` when no CAS session was resolved.
#[derive(Debug, Clone)]
pub struct CasPrincipal(pub AuthenticationResponse);

impl<S> FromRequestParts<S> for CasPrincipal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticationResponse>()
            .cloned()
            .map(CasPrincipal)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_ticket_param() {
        let uri: Uri = "/page?a=1&ticket=ST-1&b=2".parse().unwrap();
        assert_eq!(ticket(&uri).as_deref(), Some("ST-1"));

        let uri: Uri = "/page?ticket=".parse().unwrap();
        assert_eq!(ticket(&uri), None);

        let uri: Uri = "/page".parse().unwrap();
        assert_eq!(ticket(&uri), None);
    }

    #[test]
    fn test_query_without_ticket_keeps_order() {
        assert_eq!(query_without_ticket("z=1&ticket=ST-1&a=2"), "z=1&a=2");
        assert_eq!(query_without_ticket("ticket=ST-1"), "");
        assert_eq!(query_without_ticket("q=a+b&ticket=x&q=c"), "q=a+b&q=c");
    }

    #[test]
    fn test_path_without_ticket() {
        let uri: Uri = "/docs/page?ticket=ST-1".parse().unwrap();
        assert_eq!(path_without_ticket(&uri), "/docs/page");

        let uri: Uri = "/docs/page?x=1&ticket=ST-1".parse().unwrap();
        assert_eq!(path_without_ticket(&uri), "/docs/page?x=1");
    }

    #[test]
    fn test_accessors() {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert!(!is_authenticated(&req));
        assert_eq!(username(&req), None);

        let mut resp = AuthenticationResponse {
            user: "jdoe".into(),
            ..Default::default()
        };
        resp.attributes.add("email", "jdoe@example.edu");
        req.extensions_mut().insert(resp);

        assert!(is_authenticated(&req));
        assert_eq!(username(&req), Some("jdoe"));
        assert_eq!(attributes(&req).and_then(|a| a.get("email")), Some("jdoe@example.edu"));
    }

    #[tokio::test]
    async fn test_principal_extractor() {
        let req = Request::builder().uri("/").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let rejected = CasPrincipal::from_request_parts(&mut parts, &()).await;
        assert_eq!(rejected.unwrap_err(), StatusCode::UNAUTHORIZED);

        parts.extensions.insert(AuthenticationResponse {
            user: "jdoe".into(),
            ..Default::default()
        });
        let CasPrincipal(resp) = CasPrincipal::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(resp.user, "jdoe");
    }
}
