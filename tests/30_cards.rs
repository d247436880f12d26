mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use bizcard_api::database::CardStore;
use common::{card_payload, TestServer};

#[tokio::test]
async fn business_user_creates_card_with_generated_biz_number() -> Result<()> {
    let server = TestServer::start().await?;
    let (owner, token) = server.seed_with_token("biz@example.com", false, true).await?;

    let card = server.create_card(&token).await?;
    assert_eq!(card["user_id"], owner.id.to_string());
    assert_eq!(card["likes"], json!([]));
    assert_eq!(card["image"]["alt"], "Business Image");

    let biz: u32 = card["bizNumber"].as_str().unwrap_or_default().parse()?;
    assert!((1_000..=999_999_999).contains(&biz));
    Ok(())
}

#[tokio::test]
async fn non_business_user_cannot_create_card() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, token) = server.seed_with_token("plain@example.com", false, false).await?;

    let res = server
        .post("/cards")
        .header("x-auth-token", &token)
        .json(&card_payload("Nope"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(server.state.cards.list_cards().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn cards_are_public_to_read() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, token) = server.seed_with_token("biz@example.com", false, true).await?;
    let card = server.create_card(&token).await?;
    let id = card["_id"].as_str().unwrap_or_default().to_string();

    let body: Value = server.get("/cards").send().await?.json().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let res = server.get(&format!("/cards/{}", id)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get(&format!("/cards/{}", uuid::Uuid::new_v4())).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn my_cards_lists_only_callers_cards() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, mine) = server.seed_with_token("mine@example.com", false, true).await?;
    let (_, theirs) = server.seed_with_token("theirs@example.com", false, true).await?;
    server.create_card(&mine).await?;
    server.create_card(&mine).await?;
    server.create_card(&theirs).await?;

    let body: Value = server
        .get("/cards/my-cards")
        .header("x-auth-token", &mine)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn only_owner_may_edit_card() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, owner) = server.seed_with_token("owner@example.com", false, true).await?;
    let (_, stranger) = server.seed_with_token("stranger@example.com", false, true).await?;
    let (_, admin) = server.seed_with_token("admin@example.com", true, false).await?;
    let card = server.create_card(&owner).await?;
    let path = format!("/cards/{}", card["_id"].as_str().unwrap_or_default());

    // PUT requires cardOwner alone; admin status does not help.
    for token in [&stranger, &admin] {
        let res = server
            .put(&path)
            .header("x-auth-token", token)
            .json(&card_payload("Hijacked"))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    let res = server
        .put(&path)
        .header("x-auth-token", &owner)
        .json(&card_payload("Renamed Corner"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["title"], "Renamed Corner");
    assert_eq!(body["data"]["bizNumber"], card["bizNumber"]);
    Ok(())
}

#[tokio::test]
async fn admin_deletes_card_it_does_not_own() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, owner) = server.seed_with_token("owner@example.com", false, true).await?;
    let (_, stranger) = server.seed_with_token("stranger@example.com", false, false).await?;
    let (_, admin) = server.seed_with_token("admin@example.com", true, false).await?;
    let card = server.create_card(&owner).await?;
    let path = format!("/cards/{}", card["_id"].as_str().unwrap_or_default());

    let res = server.delete(&path).header("x-auth-token", &stranger).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server.delete(&path).header("x-auth-token", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Admin passes the guard even with no card behind the id; the handler then 404s.
    let res = server.delete(&path).header("x-auth-token", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn like_once_per_user() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, owner) = server.seed_with_token("owner@example.com", false, true).await?;
    let (fan, fan_token) = server.seed_with_token("fan@example.com", false, false).await?;
    let card = server.create_card(&owner).await?;
    let path = format!("/cards/{}", card["_id"].as_str().unwrap_or_default());

    let res = server.patch(&path).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server.patch(&path).header("x-auth-token", &fan_token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["likes"][0]["user_id"], fan.id.to_string());

    let res = server.patch(&path).header("x-auth-token", &fan_token).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let (_, message) = common::error_of(res).await?;
    assert_eq!(message, "You already liked this card.");
    Ok(())
}

#[tokio::test]
async fn admin_reassigns_biz_number() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, owner) = server.seed_with_token("owner@example.com", false, true).await?;
    let (_, admin) = server.seed_with_token("admin@example.com", true, false).await?;
    let first = server.create_card(&owner).await?;
    let second = server.create_card(&owner).await?;
    let path = format!("/cards/bizNum/{}", first["_id"].as_str().unwrap_or_default());

    let res = server
        .patch(&path)
        .header("x-auth-token", &owner)
        .json(&json!({"bizNumber": 424242}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .patch(&path)
        .header("x-auth-token", &admin)
        .json(&json!({"bizNumber": 424242}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["bizNumber"], "424242");

    let res = server
        .patch(&path)
        .header("x-auth-token", &admin)
        .json(&json!({"bizNumber": second["bizNumber"]}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = server.patch(&path).header("x-auth-token", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_ne!(body["data"]["bizNumber"], "424242");

    let missing = format!("/cards/bizNum/{}", uuid::Uuid::new_v4());
    let res = server.patch(&missing).header("x-auth-token", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn owner_edit_keeps_existing_likes() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, owner) = server.seed_with_token("owner@example.com", false, true).await?;
    let (fan, fan_token) = server.seed_with_token("fan@example.com", false, false).await?;
    let card = server.create_card(&owner).await?;
    let path = format!("/cards/{}", card["_id"].as_str().unwrap_or_default());

    let res = server.patch(&path).header("x-auth-token", &fan_token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .put(&path)
        .header("x-auth-token", &owner)
        .json(&card_payload("Falafel Corner Deluxe"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["title"], "Falafel Corner Deluxe");
    assert_eq!(body["data"]["likes"][0]["user_id"], fan.id.to_string());
    Ok(())
}
