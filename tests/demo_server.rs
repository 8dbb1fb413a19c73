//! The demo server's router: public health probe, protected whoami.

use axum::http::StatusCode;
use axum_cas::config::AppConfig;
use axum_cas::HttpServer;
use tower::ServiceExt;

mod common;

use common::{body_text, cas_config, get, location, session_cookie};

#[tokio::test]
async fn test_health_bypasses_cas() {
    let server = common::start_cas_server().await;
    let config = AppConfig {
        cas: cas_config(&server),
        ..AppConfig::default()
    };
    let router = HttpServer::new(config).unwrap().router();

    let response = router.oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_whoami_reports_identity() {
    let server = common::start_cas_server().await;
    common::mount_validation(
        &server,
        "ST-7",
        "https://app.example.edu/",
        200,
        common::success_xml("jdoe", &[("email", "jdoe@example.edu")]),
    )
    .await;

    let config = AppConfig {
        cas: cas_config(&server),
        ..AppConfig::default()
    };
    let router = HttpServer::new(config).unwrap().router();

    let response = router.clone().oneshot(get("/?ticket=ST-7", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response);

    let response = router.oneshot(get("/", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["user"], "jdoe");
    assert_eq!(json["attributes"]["email"][0], "jdoe@example.edu");
    assert_eq!(json["headers"]["x-cas-user"], "jdoe");
    assert_eq!(json["headers"]["x-cas-attr-email"], "jdoe@example.edu");
}
