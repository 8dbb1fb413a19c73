//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    routing::any,
    Router,
};
use axum_cas::config::CasConfig;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const HOST: &str = "app.example.edu";

/// Start a mock CAS server.
#[allow(dead_code)]
pub async fn start_cas_server() -> MockServer {
    MockServer::start().await
}

/// CAS config pointing at the mock server.
#[allow(dead_code)]
pub fn cas_config(server: &MockServer) -> CasConfig {
    CasConfig {
        server_url: format!("{}/cas/", server.uri()),
        ..CasConfig::default()
    }
}

/// Answer validation of `ticket` for `service` with `body`.
#[allow(dead_code)]
pub async fn mount_validation(server: &MockServer, ticket: &str, service: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path("/cas/p3/serviceValidate"))
        .and(query_param("ticket", ticket))
        .and(query_param("service", service))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

/// A CAS 3 success document.
#[allow(dead_code)]
pub fn success_xml(user: &str, attributes: &[(&str, &str)]) -> String {
    let attrs: String = attributes
        .iter()
        .map(|(k, v)| format!("<cas:{0}>{1}</cas:{0}>", k, v))
        .collect();
    format!(
        r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationSuccess>
    <cas:user>{}</cas:user>
    <cas:attributes>{}</cas:attributes>
  </cas:authenticationSuccess>
</cas:serviceResponse>"#,
        user, attrs
    )
}

#[allow(dead_code)]
pub fn failure_xml(code: &str) -> String {
    format!(
        r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationFailure code="{}">Ticket not recognized</cas:authenticationFailure>
</cas:serviceResponse>"#,
        code
    )
}

/// Protected app that counts calls and echoes the CAS headers it saw.
#[allow(dead_code)]
pub fn counting_app(calls: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/{*path}",
        any(move |request: Request<Body>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let mut seen: Vec<String> = request
                    .headers()
                    .iter()
                    .filter(|(k, _)| k.as_str().starts_with("x-cas-") || k.as_str() == "x-forwarded-proto")
                    .map(|(k, v)| format!("{}={}", k, v.to_str().unwrap_or("?")))
                    .collect();
                seen.sort();
                seen.join("\n")
            }
        }),
    )
}

/// GET against the test host, optionally carrying a cookie.
#[allow(dead_code)]
pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).header(header::HOST, HOST);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` part of the response's Set-Cookie.
#[allow(dead_code)]
pub fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response sets a cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

#[allow(dead_code)]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response is a redirect")
        .to_str()
        .unwrap()
        .to_string()
}

#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
