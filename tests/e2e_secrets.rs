//! E2E tests for the protected secret pages

mod common;

use common::{TestServer, location, session_cookie};

const DEFAULT_SECRET: &str = "Jack Bauer is my hero.";

#[tokio::test]
async fn test_protected_pages_redirect_without_session() {
    let server = TestServer::new().await;

    for path in ["/secrets", "/submit"] {
        let response = server.get(path, None).await;
        assert!(response.status().is_redirection(), "{path}");
        assert_eq!(location(&response).as_deref(), Some("/login"), "{path}");
    }

    let response = server
        .post_form("/submit", &[("secret", "sneaky")], None)
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response).as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_default_secret_for_new_user() {
    let server = TestServer::new().await;
    let response = server.register("kim@ctu.gov", "pw").await;
    let cookie = session_cookie(&response).expect("session cookie");

    let body = server
        .get("/secrets", Some(&cookie))
        .await
        .text()
        .await
        .unwrap();

    assert!(body.contains(DEFAULT_SECRET));
}

#[tokio::test]
async fn test_submit_then_view_secret() {
    let server = TestServer::new().await;
    let response = server.register("david@ctu.gov", "pw").await;
    let cookie = session_cookie(&response).expect("session cookie");

    let response = server.get("/submit", Some(&cookie)).await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains(r#"name="secret""#));

    let response = server
        .post_form("/submit", &[("secret", "I never liked Sherry")], Some(&cookie))
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response).as_deref(), Some("/secrets"));

    let body = server
        .get("/secrets", Some(&cookie))
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("I never liked Sherry"));
    assert!(!body.contains(DEFAULT_SECRET));
}

#[tokio::test]
async fn test_secret_survives_new_login() {
    let server = TestServer::new().await;
    let response = server.register("mike@ctu.gov", "pw").await;
    let cookie = session_cookie(&response).expect("session cookie");
    server
        .post_form("/submit", &[("secret", "chess <3")], Some(&cookie))
        .await;

    let response = server.login("mike@ctu.gov", "pw").await;
    let second = session_cookie(&response).expect("session cookie");
    assert_ne!(cookie, second);

    let body = server
        .get("/secrets", Some(&second))
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("chess &lt;3"));
}

#[tokio::test]
async fn test_secrets_are_per_user() {
    let server = TestServer::new().await;
    let first = session_cookie(&server.register("one@ctu.gov", "pw").await).unwrap();
    let second = session_cookie(&server.register("two@ctu.gov", "pw").await).unwrap();

    server
        .post_form("/submit", &[("secret", "first secret")], Some(&first))
        .await;

    let body = server
        .get("/secrets", Some(&second))
        .await
        .text()
        .await
        .unwrap();
    assert!(!body.contains("first secret"));
    assert!(body.contains(DEFAULT_SECRET));
}
