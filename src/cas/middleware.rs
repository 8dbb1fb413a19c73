//! The CAS client's two request handlers.
//!
//! - [`handle`] resolves the session: back-channel single logout, session
//!   cookie lookup, or service-ticket validation. It never rejects.
//! - [`require_authentication`] enforces: unauthenticated requests go to the
//!   CAS login page, and the logout path ends the session.
//!
//! Both are `axum::middleware::from_fn_with_state` functions over
//! `Arc<CasClient>`.

use std::ops::ControlFlow;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::cas::client::CasClient;
use crate::cas::request::{is_authenticated, ticket};
use crate::cas::response::parse_logout_request;
use crate::cas::session::{removal_cookie, session_cookie, session_id, to_header_value};
use crate::http::response::found;

/// Resolve the CAS identity for the request and attach it as an extension.
pub async fn handle(
    State(client): State<Arc<CasClient>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut request = match intercept_single_logout(&client, request).await {
        ControlFlow::Break(response) => return response,
        ControlFlow::Continue(request) => request,
    };

    let cookie_name = &client.config().cookie.name;
    let existing = session_id(request.headers(), cookie_name)
        .and_then(|id| client.resolve_session(&id));

    let mut issued = None;
    match existing {
        Some(resp) => {
            request.extensions_mut().insert(resp);
        }
        None => {
            if let Some(ticket) = ticket(request.uri()) {
                match client.service_url(&request) {
                    Ok(service) => match client.validate_ticket(&ticket, &service).await {
                        Ok(resp) => {
                            tracing::info!(user = %resp.user, service = %service, "CAS ticket validated");
                            let id = client.start_session(&ticket, resp.clone());
                            issued = Some(session_cookie(&client.config().cookie, &id));
                            request.extensions_mut().insert(resp);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, service = %service, "CAS ticket validation failed");
                        }
                    },
                    Err(e) => tracing::warn!(error = %e, "Cannot derive service URL"),
                }
            }
        }
    }

    let mut response = next.run(request).await;
    if let Some(value) = issued.as_ref().and_then(to_header_value) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

/// Redirect unauthenticated requests to the CAS login page.
pub async fn require_authentication(
    State(client): State<Arc<CasClient>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_authenticated(&request) {
        return match client.service_url(&request) {
            Ok(service) => {
                tracing::debug!(path = %request.uri().path(), "Redirecting to CAS login");
                found(client.login_url(&service).as_str())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot derive service URL");
                (StatusCode::BAD_REQUEST, "Cannot determine service URL").into_response()
            }
        };
    }

    if request.uri().path() == client.config().logout_path {
        if let Some(id) = session_id(request.headers(), &client.config().cookie.name) {
            client.end_session(&id);
        }

        let origin = client.service_url(&request).ok().map(|mut service| {
            service.set_path("/");
            service.set_query(None);
            service
        });

        tracing::info!("Local CAS session ended, redirecting to CAS logout");
        let mut response = found(client.logout_url(origin.as_ref()).as_str());
        if let Some(value) = to_header_value(&removal_cookie(&client.config().cookie)) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        return response;
    }

    next.run(request).await
}

/// Answer back-channel logout POSTs, passing every other request through
/// with its body intact.
async fn intercept_single_logout(
    client: &CasClient,
    request: Request<Body>,
) -> ControlFlow<Response, Request<Body>> {
    let limit = client.config().max_logout_body_bytes;
    if request.method() != Method::POST
        || !is_form(request.headers())
        || content_length(request.headers()).map_or(true, |len| len > limit)
    {
        return ControlFlow::Continue(request);
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read form body");
            return ControlFlow::Break(StatusCode::BAD_REQUEST.into_response());
        }
    };

    let logout_request = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == "logoutRequest")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty());

    match logout_request {
        Some(xml) => {
            match parse_logout_request(&xml) {
                Some(ticket) => {
                    let sessions = client.single_logout(&ticket);
                    tracing::info!(sessions, "CAS single logout processed");
                }
                None => tracing::warn!("Logout request carries no SessionIndex"),
            }
            ControlFlow::Break(StatusCode::OK.into_response())
        }
        None => ControlFlow::Continue(Request::from_parts(parts, Body::from(bytes))),
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
