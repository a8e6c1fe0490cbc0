mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn published_video_uses_uploaded_urls() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;
    let video_id = app.publish_video(&alice, "first").await;

    let res = app
        .get(&format!("/api/v1/videos/{}", video_id), &alice.access_token)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["owner_id"], alice.user_id.as_str());
    assert!(res.body["video_file"]
        .as_str()
        .unwrap()
        .starts_with("https://media.test/"));
    assert_eq!(res.body["duration"], 42.0);
    assert_eq!(app.uploader.uploaded().len(), 2);
}

#[tokio::test]
async fn publishing_without_a_file_is_bad_request() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;

    let res = app
        .multipart(
            Method::POST,
            "/api/v1/videos",
            &alice.access_token,
            &[("title", "t"), ("description", "d")],
            &[("videoFile", "clip.mp4", &b"bytes"[..])],
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(app.uploader.uploaded().is_empty());
}

#[tokio::test]
async fn only_the_owner_may_change_a_video() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;
    let bob = app.signed_in("bob").await;
    let video_id = app.publish_video(&alice, "mine").await;
    let uri = format!("/api/v1/videos/{}", video_id);

    let res = app
        .patch(&uri, &bob.access_token, Some(json!({ "title": "stolen" })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.delete(&uri, &bob.access_token).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .patch(
            &format!("/api/v1/videos/toggle/publish/{}", video_id),
            &bob.access_token,
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .patch(&uri, &alice.access_token, Some(json!({ "title": "renamed" })))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["title"], "renamed");

    let res = app.delete(&uri, &alice.access_token).await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.get(&uri, &alice.access_token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unpublished_videos_are_hidden_from_others() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;
    let bob = app.signed_in("bob").await;
    let video_id = app.publish_video(&alice, "draft").await;

    let res = app
        .patch(
            &format!("/api/v1/videos/toggle/publish/{}", video_id),
            &alice.access_token,
            None,
        )
        .await;
    assert_eq!(res.body["is_published"], false);

    let uri = format!("/api/v1/videos/{}", video_id);
    assert_eq!(app.get(&uri, &bob.access_token).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get(&uri, &alice.access_token).await.status, StatusCode::OK);

    let listing = format!("/api/v1/videos?userId={}", alice.user_id);
    let seen_by_bob = app.get(&listing, &bob.access_token).await;
    assert!(seen_by_bob.body.as_array().unwrap().is_empty());
    let seen_by_alice = app.get(&listing, &alice.access_token).await;
    assert_eq!(seen_by_alice.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn video_listing_is_paginated_newest_first() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;
    for title in ["one", "two", "three"] {
        app.publish_video(&alice, title).await;
    }

    let res = app
        .get(
            &format!("/api/v1/videos?userId={}&page=1&limit=2", alice.user_id),
            &alice.access_token,
        )
        .await;
    let page = res.body.as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["title"], "three");

    let res = app
        .get(
            &format!("/api/v1/videos?userId={}&page=2&limit=2", alice.user_id),
            &alice.access_token,
        )
        .await;
    assert_eq!(res.body[0]["title"], "one");
}

#[tokio::test]
async fn drafts_do_not_empty_other_viewers_pages() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;
    let bob = app.signed_in("bob").await;
    app.publish_video(&alice, "public").await;
    for title in ["draft-1", "draft-2"] {
        let id = app.publish_video(&alice, title).await;
        app.patch(
            &format!("/api/v1/videos/toggle/publish/{}", id),
            &alice.access_token,
            None,
        )
        .await;
    }

    let res = app
        .get(
            &format!("/api/v1/videos?userId={}&page=1&limit=2", alice.user_id),
            &bob.access_token,
        )
        .await;
    let page = res.body.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["title"], "public");
}

#[tokio::test]
async fn listing_videos_of_unknown_user_is_not_found() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;

    let res = app
        .get("/api/v1/videos?userId=nobody", &alice.access_token)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_are_owner_gated() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;
    let bob = app.signed_in("bob").await;
    let video_id = app.publish_video(&alice, "talk").await;

    let res = app
        .post(
            &format!("/api/v1/comments/{}", video_id),
            Some(&bob.access_token),
            json!({ "content": "nice" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let comment_id = res.body["_id"].as_str().unwrap().to_string();

    let listed = app
        .get(&format!("/api/v1/comments/{}", video_id), &alice.access_token)
        .await;
    assert_eq!(listed.body[0]["content"], "nice");

    let uri = format!("/api/v1/comments/c/{}", comment_id);
    let res = app
        .patch(&uri, &alice.access_token, Some(json!({ "content": "edited" })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .patch(&uri, &bob.access_token, Some(json!({ "content": "nicer" })))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["content"], "nicer");

    assert_eq!(app.delete(&uri, &alice.access_token).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(&uri, &bob.access_token).await.status, StatusCode::OK);
}

#[tokio::test]
async fn commenting_on_a_missing_video_is_not_found() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;

    let res = app
        .post(
            "/api/v1/comments/missing",
            Some(&alice.access_token),
            json!({ "content": "hello?" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tweets_lifecycle() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;
    let bob = app.signed_in("bob").await;

    let res = app
        .post("/api/v1/tweets", Some(&alice.access_token), json!({ "content": "" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post(
            "/api/v1/tweets",
            Some(&alice.access_token),
            json!({ "content": "first" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let tweet_id = res.body["_id"].as_str().unwrap().to_string();

    let listed = app
        .get(
            &format!("/api/v1/tweets/user/{}", alice.user_id),
            &bob.access_token,
        )
        .await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/tweets/{}", tweet_id);
    let res = app
        .patch(&uri, &bob.access_token, Some(json!({ "content": "mine now" })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    assert_eq!(app.delete(&uri, &alice.access_token).await.status, StatusCode::OK);
    assert_eq!(app.delete(&uri, &alice.access_token).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn playlists_add_is_idempotent_and_owner_gated() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;
    let bob = app.signed_in("bob").await;
    let video_id = app.publish_video(&alice, "song").await;

    let res = app
        .post(
            "/api/v1/playlists",
            Some(&alice.access_token),
            json!({ "name": "Favourites", "description": "best of" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let playlist_id = res.body["_id"].as_str().unwrap().to_string();

    let add = format!("/api/v1/playlists/add/{}/{}", video_id, playlist_id);
    let res = app.patch(&add, &bob.access_token, None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    app.patch(&add, &alice.access_token, None).await;
    let res = app.patch(&add, &alice.access_token, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["videos"].as_array().unwrap().len(), 1);

    let remove = format!("/api/v1/playlists/remove/{}/{}", video_id, playlist_id);
    let res = app.patch(&remove, &alice.access_token, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["videos"].as_array().unwrap().is_empty());
    let res = app.patch(&remove, &alice.access_token, None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let uri = format!("/api/v1/playlists/{}", playlist_id);
    let res = app
        .patch(&uri, &alice.access_token, Some(json!({ "name": "Renamed" })))
        .await;
    assert_eq!(res.body["name"], "Renamed");

    let listed = app
        .get(
            &format!("/api/v1/playlists/user/{}", alice.user_id),
            &bob.access_token,
        )
        .await;
    assert_eq!(listed.body[0]["name"], "Renamed");

    assert_eq!(app.delete(&uri, &bob.access_token).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(&uri, &alice.access_token).await.status, StatusCode::OK);
    assert_eq!(app.get(&uri, &alice.access_token).await.status, StatusCode::NOT_FOUND);
}
