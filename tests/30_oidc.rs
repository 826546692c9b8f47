mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use devportal_gateway::session::{AuthContext, Role, Session, TransientUser};

fn pending_session(username: &str, provider: &str) -> Session {
    let mut session = Session::new(Some(AuthContext::provider(
        username,
        vec![Role::Dev],
        provider,
    )));
    session.pending_profile_user = Some(TransientUser::new(username, provider));
    session
}

#[tokio::test]
async fn incomplete_provider_signup_is_redirected_everywhere() -> Result<()> {
    let app = common::test_app();
    let id = app.seed_session(pending_session("newbie", "github")).await;

    for path in [
        "/devportal/dev/newbie/dashboard",
        "/devportal/dev/newbie/tickets",
        "/devportal/dev/newbie/repositories/view/platform-core",
    ] {
        let res = app.get(path, Some(id)).await?;
        assert!(res.status().is_redirection(), "{path} must redirect");
        assert_eq!(common::location(&res)?, "/complete-profile");
    }
    Ok(())
}

#[tokio::test]
async fn oauth2_marked_deep_links_are_still_redirected() -> Result<()> {
    let app = common::test_app();
    let id = app.seed_session(pending_session("newbie", "github")).await;

    // The marker substring in the URL is logged as a bypass attempt but the
    // outcome is the same deterministic redirect
    let res = app
        .get("/devportal/dev/newbie/dashboard?from=oauth2", Some(id))
        .await?;
    assert!(res.status().is_redirection());
    assert_eq!(common::location(&res)?, "/complete-profile");
    Ok(())
}

#[tokio::test]
async fn completing_the_profile_unlocks_the_portal() -> Result<()> {
    let app = common::test_app();
    let id = app.seed_session(pending_session("newbie", "github")).await;

    let res = app
        .post_json(
            "/complete-profile",
            Some(id),
            &json!({ "email": "newbie@example.com", "display_name": "New Bie" }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::body_json(res).await?;
    assert_eq!(body["data"]["username"], "newbie");
    assert!(body["data"]["id"].is_string(), "a persistent id is assigned");

    let session = app.sessions.view(id).await?;
    assert!(session.pending_profile_user.is_none());

    let res = app.get("/devportal/dev/newbie/dashboard", Some(id)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn callback_establishes_the_pending_session() -> Result<()> {
    let app = common::test_app();

    let res = app
        .get("/login/oauth2/code/github?login=newbie", None)
        .await?;
    assert!(res.status().is_redirection());
    assert_eq!(common::location(&res)?, "/complete-profile");
    let id = common::set_cookie_session(&res)?;

    let session = app.sessions.view(id).await?;
    assert!(session.pending_profile_user.as_ref().unwrap().is_pending());
    assert!(session.auth.as_ref().unwrap().origin.is_provider());
    Ok(())
}

#[tokio::test]
async fn returning_provider_users_go_straight_to_the_dashboard() -> Result<()> {
    let app = common::test_app();

    let res = app
        .get("/login/oauth2/code/github?login=oldtimer&first_login=false", None)
        .await?;
    assert!(res.status().is_redirection());
    assert_eq!(common::location(&res)?, "/devportal/dev/oldtimer/dashboard");
    let id = common::set_cookie_session(&res)?;

    let res = app.get("/devportal/dev/oldtimer/dashboard", Some(id)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::body_json(res).await?;
    assert_eq!(body["data"]["authenticated"], true);
    Ok(())
}

#[tokio::test]
async fn completion_without_a_pending_signup_conflicts() -> Result<()> {
    let app = common::test_app();
    let id = app
        .seed_auth(AuthContext::password("jdoe", vec![Role::Dev]))
        .await;

    let res = app
        .post_json("/complete-profile", Some(id), &json!({}))
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    Ok(())
}
