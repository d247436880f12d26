mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{TestServer, PASSWORD};

const FORWARDED_FOR: &str = "x-forwarded-for";

async fn login(server: &TestServer, addr: &str, email: &str, password: &str) -> Result<reqwest::Response> {
    Ok(server
        .post("/users/login")
        .header(FORWARDED_FOR, addr)
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?)
}

#[tokio::test]
async fn correct_credentials_return_verifiable_token() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.seed_user("login@example.com", false, true).await?;

    let res = login(&server, "10.0.0.1", "LOGIN@example.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    let token = body["data"]["token"].as_str().unwrap_or_default();
    let claims = server.state.tokens.verify(token)?;
    assert_eq!(claims.sub, user.id);
    assert!(claims.is_business);
    assert!(!claims.is_admin);
    Ok(())
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_user("login@example.com", false, false).await?;

    let wrong_password = login(&server, "10.0.0.2", "login@example.com", "nope-nope").await?;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let (_, first) = common::error_of(wrong_password).await?;

    let unknown = login(&server, "10.0.0.2", "ghost@example.com", PASSWORD).await?;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let (_, second) = common::error_of(unknown).await?;

    assert_eq!(first, "Invalid email or password");
    assert_eq!(first, second);
    assert_eq!(server.state.throttle.attempts("10.0.0.2").tries, 2);
    Ok(())
}

#[tokio::test]
async fn three_failures_block_even_correct_password_until_cleared() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.seed_user("victim@example.com", false, false).await?;
    let (_, admin) = server.seed_with_token("admin@example.com", true, false).await?;
    let addr = "1.2.3.4";

    for attempt in 1..=3 {
        let res = login(&server, addr, "victim@example.com", "wrong-password").await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "attempt {}", attempt);
    }
    assert!(server.state.throttle.is_blocked(addr));

    let res = login(&server, addr, "victim@example.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let (code, _) = common::error_of(res).await?;
    assert_eq!(code, "TOO_MANY_REQUESTS");

    // Another address is unaffected.
    let res = login(&server, "5.6.7.8", "victim@example.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .delete(&format!("/auth/login-attempts/{}", addr))
        .header("x-auth-token", &admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["previous"]["tries"], 3);
    assert_eq!(body["data"]["previous"]["blocked"], true);

    let res = login(&server, addr, "victim@example.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let claims = server.state.tokens.verify(body["data"]["token"].as_str().unwrap_or_default())?;
    assert_eq!(claims.sub, user.id);
    Ok(())
}

#[tokio::test]
async fn two_failures_do_not_block_and_success_resets() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_user("almost@example.com", false, false).await?;
    let addr = "9.9.9.9";

    for _ in 0..2 {
        login(&server, addr, "almost@example.com", "wrong-password").await?;
    }
    assert!(!server.state.throttle.is_blocked(addr));

    let res = login(&server, addr, "almost@example.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(server.state.throttle.attempts(addr).tries, 0);

    // Counting restarts from one after a successful login.
    login(&server, addr, "almost@example.com", "wrong-password").await?;
    assert_eq!(server.state.throttle.attempts(addr).tries, 1);
    Ok(())
}

#[tokio::test]
async fn clearing_attempts_requires_admin() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, regular) = server.seed_with_token("regular@example.com", false, true).await?;
    server.state.throttle.record_failure("2.2.2.2");

    let res = server
        .delete("/auth/login-attempts/2.2.2.2")
        .header("x-auth-token", &regular)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(server.state.throttle.attempts("2.2.2.2").tries, 1);
    Ok(())
}

#[tokio::test]
async fn rotating_client_supplied_forwarded_entries_still_block() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_user("target@example.com", false, false).await?;
    let proxy_seen = "203.0.113.9";

    for i in 1..=3 {
        let chain = format!("10.66.0.{}, {}", i, proxy_seen);
        let res = login(&server, &chain, "target@example.com", "wrong-password").await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "attempt {}", i);
    }
    assert!(server.state.throttle.is_blocked(proxy_seen));
    assert_eq!(server.state.throttle.attempts("10.66.0.1").tries, 0);

    let res = login(&server, "10.66.0.99, 203.0.113.9", "target@example.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}
