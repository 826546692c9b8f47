mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn signin_establishes_an_authenticated_session() -> Result<()> {
    let app = common::test_app();

    let res = app
        .post_json(
            "/signin",
            None,
            &json!({ "username": "msmith", "password": "hunter2", "roles": ["po"] }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let id = common::set_cookie_session(&res)?;
    let body = common::body_json(res).await?;
    assert_eq!(body["data"]["role"], "po");
    assert_eq!(body["data"]["dashboard"], "/devportal/po/msmith/dashboard");

    let res = app.get("/devportal/po/msmith/reports", Some(id)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::body_json(res).await?;
    assert_eq!(body["data"]["authenticated"], true);
    Ok(())
}

#[tokio::test]
async fn signin_rejects_malformed_usernames() -> Result<()> {
    let app = common::test_app();

    let res = app
        .post_json(
            "/signin",
            None,
            &json!({ "username": "bad user!", "password": "pw" }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .post_json("/signin", None, &json!({ "username": "jdoe", "password": "" }))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unknown_asserted_roles_default_to_dev() -> Result<()> {
    let app = common::test_app();

    let res = app
        .post_json(
            "/signin",
            None,
            &json!({ "username": "jdoe", "password": "pw", "roles": ["wizard"] }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::body_json(res).await?;
    assert_eq!(body["data"]["role"], "dev");
    Ok(())
}

#[tokio::test]
async fn signout_destroys_the_session() -> Result<()> {
    let app = common::test_app();

    let res = app
        .post_json(
            "/signin",
            None,
            &json!({ "username": "jdoe", "password": "pw" }),
        )
        .await?;
    let id = common::set_cookie_session(&res)?;
    assert_eq!(app.sessions.count().await, 1);

    let res = app.post_json("/signout", Some(id), &json!({})).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.sessions.count().await, 0);

    // The stale cookie degrades to an anonymous request
    let res = app.get("/devportal/dev/jdoe/dashboard", Some(id)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::body_json(res).await?;
    assert_eq!(body["data"]["authenticated"], false);

    // Signing out twice is harmless
    let res = app.post_json("/signout", Some(id), &json!({})).await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}
