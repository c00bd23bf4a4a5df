//! Router-level tests
//!
//! Drive the full application through `axum-test`: login gate, visibility,
//! the redirect-versus-403 split on post denials and the comment path checks.

use super::*;
use crate::config::Config;
use crate::db::repositories::{PostRepository, SqlxPostRepository};
use crate::db::{fixtures, DbPool};
use crate::models::{Category, User};
use crate::services::{LoginInput, RegisterInput};
use axum::http::{header, HeaderValue, StatusCode};
use axum_test::multipart::MultipartForm;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::Value;
use tempfile::TempDir;

const PASSWORD: &str = "correct-horse-42";

struct TestApp {
    server: TestServer,
    state: AppState,
    _uploads: TempDir,
}

impl TestApp {
    fn pool(&self) -> &DbPool {
        &self.state.pool
    }
}

async fn app() -> TestApp {
    let pool = fixtures::migrated_pool().await;
    let uploads = TempDir::new().unwrap();

    let mut config = Config::default();
    config.upload.path = uploads.path().to_path_buf();
    config.theme.path = uploads.path().join("no-theme");
    config.blog.site_name = "Test Blog".to_string();
    config.blog.paginate_by = 2;

    let state = AppState::new(pool, &config).expect("Failed to build state");
    let server = TestServer::new(build_router(state.clone())).expect("Failed to start server");
    TestApp {
        server,
        state,
        _uploads: uploads,
    }
}

/// Register `username` and return the user with a session cookie header
async fn login_as(app: &TestApp, username: &str) -> (User, HeaderValue) {
    let user = app
        .state
        .user_service
        .register(RegisterInput {
            username: username.to_string(),
            password1: PASSWORD.to_string(),
            password2: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    let (_, session) = app
        .state
        .user_service
        .login(LoginInput {
            username: username.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    let cookie = HeaderValue::from_str(&format!("session={}", session.id)).unwrap();
    (user, cookie)
}

async fn retitle(pool: &DbPool, post_id: i64, title: &str) {
    sqlx::query("UPDATE posts SET title = ? WHERE id = ?")
        .bind(title)
        .bind(post_id)
        .execute(pool)
        .await
        .unwrap();
}

async fn reschedule(pool: &DbPool, post_id: i64, days: i64) {
    sqlx::query("UPDATE posts SET pub_date = ? WHERE id = ?")
        .bind(Utc::now() + Duration::days(days))
        .bind(post_id)
        .execute(pool)
        .await
        .unwrap();
}

fn location(response: &axum_test::TestResponse) -> String {
    response
        .header("location")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_anonymous_create_redirects_to_login() {
    let app = app().await;

    let response = app.server.get("/posts/create/").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=%2Fposts%2Fcreate%2F");

    let response = app.server.get("/auth/password_change/").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/auth/login/?next="));
}

#[tokio::test]
async fn test_login_form_sets_cookie_and_follows_next() {
    let app = app().await;
    login_as(&app, "anna").await;

    let response = app
        .server
        .post("/auth/login/")
        .form(&[
            ("username", "anna"),
            ("password", PASSWORD),
            ("next", "/posts/create/"),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/posts/create/");
    let cookie = response.header("set-cookie");
    assert!(cookie.to_str().unwrap().starts_with("session="));

    // foreign next is ignored
    let response = app
        .server
        .post("/auth/login/")
        .form(&[
            ("username", "anna"),
            ("password", PASSWORD),
            ("next", "https://evil.example/"),
        ])
        .await;
    assert_eq!(location(&response), "/");

    let response = app
        .server
        .post("/auth/login/")
        .form(&[("username", "anna"), ("password", "wrong-password")])
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("Invalid username or password"));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = app().await;
    let (_, cookie) = login_as(&app, "anna").await;

    let response = app
        .server
        .post("/auth/logout/")
        .add_header(header::COOKIE, cookie.clone())
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert!(response
        .header("set-cookie")
        .to_str()
        .unwrap()
        .ends_with("Max-Age=0"));

    // the old cookie no longer authenticates
    let response = app
        .server
        .get("/posts/create/")
        .add_header(header::COOKIE, cookie)
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_registration_redirects_to_login() {
    let app = app().await;

    let response = app
        .server
        .post("/auth/registration/")
        .form(&[
            ("username", "newcomer"),
            ("password1", PASSWORD),
            ("password2", PASSWORD),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/");

    // mismatch re-renders the form
    let response = app
        .server
        .post("/auth/registration/")
        .form(&[
            ("username", "second"),
            ("password1", PASSWORD),
            ("password2", "something-else"),
        ])
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("class=\"errors\""));
}

#[tokio::test]
async fn test_home_feed_shows_only_published_posts() {
    let app = app().await;
    let author = fixtures::user(app.pool(), "writer").await;
    let hidden: Category = fixtures::category(app.pool(), "hidden", false).await;

    let visible = fixtures::post_in(app.pool(), author.id, None).await;
    retitle(app.pool(), visible.id, "Visible story").await;
    let in_hidden = fixtures::post_in(app.pool(), author.id, Some(hidden.id)).await;
    retitle(app.pool(), in_hidden.id, "Hidden category story").await;
    let scheduled = fixtures::post_in(app.pool(), author.id, None).await;
    retitle(app.pool(), scheduled.id, "Scheduled story").await;
    reschedule(app.pool(), scheduled.id, 3).await;

    let response = app.server.get("/").await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("Visible story"));
    assert!(!html.contains("Hidden category story"));
    assert!(!html.contains("Scheduled story"));
}

#[tokio::test]
async fn test_future_post_detail_visible_to_author_only() {
    let app = app().await;
    let (author, cookie) = login_as(&app, "anna").await;
    let post = fixtures::post_in(app.pool(), author.id, None).await;
    reschedule(app.pool(), post.id, 1).await;

    let url = format!("/posts/{}/", post.id);
    let response = app.server.get(&url).await;
    response.assert_status_not_found();
    assert!(response.text().contains("Page not found"));

    app.server
        .get(&url)
        .add_header(header::COOKIE, cookie)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_post_edit_denial_redirects_but_delete_is_forbidden() {
    let app = app().await;
    let owner = fixtures::user(app.pool(), "owner").await;
    let post = fixtures::post_in(app.pool(), owner.id, None).await;
    let (_, cookie) = login_as(&app, "intruder").await;

    let response = app
        .server
        .get(&format!("/posts/{}/edit/", post.id))
        .add_header(header::COOKIE, cookie.clone())
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    app.server
        .get(&format!("/posts/{}/delete/", post.id))
        .add_header(header::COOKIE, cookie.clone())
        .await
        .assert_status_forbidden();

    let response = app
        .server
        .post(&format!("/posts/{}/delete/", post.id))
        .add_header(header::COOKIE, cookie)
        .await;
    response.assert_status_forbidden();
    assert!(response.text().contains("Access denied"));

    // still there
    app.server
        .get(&format!("/posts/{}/", post.id))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_create_post_with_multipart_form() {
    let app = app().await;
    let (author, cookie) = login_as(&app, "anna").await;

    let form = MultipartForm::new()
        .add_text("title", "Fresh post")
        .add_text("text", "Body of the fresh post")
        .add_text("pub_date", "")
        .add_text("is_published", "on");
    let response = app
        .server
        .post("/posts/create/")
        .add_header(header::COOKIE, cookie.clone())
        .multipart(form)
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/profile/{}/", author.username));

    let html = app.server.get("/profile/anna/").await.text();
    assert!(html.contains("Fresh post"));

    // a blank title re-renders the form
    let form = MultipartForm::new()
        .add_text("title", "   ")
        .add_text("text", "Body")
        .add_text("is_published", "on");
    let response = app
        .server
        .post("/posts/create/")
        .add_header(header::COOKIE, cookie)
        .multipart(form)
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("class=\"errors\""));
}

#[tokio::test]
async fn test_owner_edits_and_deletes_post() {
    let app = app().await;
    let (author, cookie) = login_as(&app, "anna").await;
    let post = fixtures::post_in(app.pool(), author.id, None).await;

    let form = MultipartForm::new()
        .add_text("title", "Edited title")
        .add_text("text", "Edited text")
        .add_text("pub_date", "2020-01-01T10:00")
        .add_text("is_published", "on");
    let response = app
        .server
        .post(&format!("/posts/{}/edit/", post.id))
        .add_header(header::COOKIE, cookie.clone())
        .multipart(form)
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));
    assert!(app
        .server
        .get(&format!("/posts/{}/", post.id))
        .await
        .text()
        .contains("Edited title"));

    let response = app
        .server
        .post(&format!("/posts/{}/delete/", post.id))
        .add_header(header::COOKIE, cookie)
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    app.server
        .get(&format!("/posts/{}/", post.id))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_resaving_post_keeps_its_exact_pub_date() {
    let app = app().await;
    let (author, cookie) = login_as(&app, "anna").await;
    let post = fixtures::post_in(app.pool(), author.id, None).await;
    let posts = SqlxPostRepository::boxed(app.pool().clone());
    let before = posts.get_by_id(post.id).await.unwrap().unwrap().pub_date;

    let form = MultipartForm::new()
        .add_text("title", "Retitled")
        .add_text("text", "Text")
        .add_text("pub_date", before.format(common::DATETIME_LOCAL_FORMAT).to_string())
        .add_text("is_published", "on");
    app.server
        .post(&format!("/posts/{}/edit/", post.id))
        .add_header(header::COOKIE, cookie)
        .multipart(form)
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let after = posts.get_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(after.title, "Retitled");
    assert_eq!(after.pub_date, before);
}

#[tokio::test]
async fn test_comment_creation_bumps_feed_count() {
    let app = app().await;
    let author = fixtures::user(app.pool(), "writer").await;
    let post = fixtures::post_in(app.pool(), author.id, None).await;
    let (_, cookie) = login_as(&app, "reader").await;

    assert!(app.server.get("/").await.text().contains("Comments (0)"));

    let response = app
        .server
        .post(&format!("/posts/{}/comment/", post.id))
        .add_header(header::COOKIE, cookie)
        .form(&[("text", "Nice one")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    assert!(app.server.get("/").await.text().contains("Comments (1)"));
    assert!(app
        .server
        .get(&format!("/posts/{}/", post.id))
        .await
        .text()
        .contains("Nice one"));
}

#[tokio::test]
async fn test_comment_on_hidden_post_is_not_found() {
    let app = app().await;
    let author = fixtures::user(app.pool(), "writer").await;
    let post = fixtures::post_in(app.pool(), author.id, None).await;
    reschedule(app.pool(), post.id, 2).await;
    let (_, cookie) = login_as(&app, "reader").await;

    app.server
        .post(&format!("/posts/{}/comment/", post.id))
        .add_header(header::COOKIE, cookie)
        .form(&[("text", "Too early")])
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_comment_through_wrong_post_is_not_found() {
    let app = app().await;
    let (commenter, cookie) = login_as(&app, "anna").await;
    let first = fixtures::post_in(app.pool(), commenter.id, None).await;
    let second = fixtures::post_in(app.pool(), commenter.id, None).await;
    let comment = fixtures::comment(app.pool(), first.id, commenter.id, "mine").await;

    app.server
        .get(&format!("/posts/{}/edit_comment/{}/", second.id, comment.id))
        .add_header(header::COOKIE, cookie.clone())
        .await
        .assert_status_not_found();

    let response = app
        .server
        .post(&format!("/posts/{}/edit_comment/{}/", first.id, comment.id))
        .add_header(header::COOKIE, cookie)
        .form(&[("text", "edited")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", first.id));
}

#[tokio::test]
async fn test_comment_forms_stay_open_after_post_is_rescheduled() {
    let app = app().await;
    let owner = fixtures::user(app.pool(), "owner").await;
    let post = fixtures::post_in(app.pool(), owner.id, None).await;
    let (boris, cookie) = login_as(&app, "boris").await;
    let comment = fixtures::comment(app.pool(), post.id, boris.id, "first!").await;
    reschedule(app.pool(), post.id, 1).await;

    let response = app
        .server
        .get(&format!("/posts/{}/edit_comment/{}/", post.id, comment.id))
        .add_header(header::COOKIE, cookie.clone())
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("first!"));

    app.server
        .get(&format!("/posts/{}/delete_comment/{}/", post.id, comment.id))
        .add_header(header::COOKIE, cookie.clone())
        .await
        .assert_status_ok();

    app.server
        .post(&format!("/posts/{}/edit_comment/{}/", post.id, comment.id))
        .add_header(header::COOKIE, cookie)
        .form(&[("text", "second!")])
        .await
        .assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_foreign_comment_is_forbidden() {
    let app = app().await;
    let owner = fixtures::user(app.pool(), "owner").await;
    let post = fixtures::post_in(app.pool(), owner.id, None).await;
    let comment = fixtures::comment(app.pool(), post.id, owner.id, "owner's words").await;
    let (_, cookie) = login_as(&app, "intruder").await;

    app.server
        .get(&format!("/posts/{}/edit_comment/{}/", post.id, comment.id))
        .add_header(header::COOKIE, cookie.clone())
        .await
        .assert_status_forbidden();

    app.server
        .post(&format!("/posts/{}/delete_comment/{}/", post.id, comment.id))
        .add_header(header::COOKIE, cookie)
        .await
        .assert_status_forbidden();
}

#[tokio::test]
async fn test_profile_edit_is_self_only() {
    let app = app().await;
    fixtures::user(app.pool(), "someone").await;
    let (_, cookie) = login_as(&app, "anna").await;

    app.server
        .get("/profile/someone/edit/")
        .add_header(header::COOKIE, cookie.clone())
        .await
        .assert_status_forbidden();

    let response = app
        .server
        .post("/profile/anna/edit/")
        .add_header(header::COOKIE, cookie)
        .form(&[
            ("first_name", "Anna"),
            ("last_name", "Karenina"),
            ("username", "anna_k"),
            ("email", "anna@example.com"),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/anna_k/");

    app.server.get("/profile/anna/").await.assert_status_not_found();
    assert!(app
        .server
        .get("/profile/anna_k/")
        .await
        .text()
        .contains("Anna Karenina"));
}

#[tokio::test]
async fn test_pagination_bounds() {
    let app = app().await;
    let author = fixtures::user(app.pool(), "writer").await;
    for _ in 0..3 {
        fixtures::post_in(app.pool(), author.id, None).await;
    }

    app.server.get("/?page=2").await.assert_status_ok();
    app.server.get("/?page=last").await.assert_status_ok();
    app.server.get("/?page=3").await.assert_status_not_found();
    app.server.get("/?page=abc").await.assert_status_not_found();

    // an empty feed still has its first page
    fixtures::user(app.pool(), "quiet").await;
    app.server.get("/profile/quiet/").await.assert_status_ok();
}

#[tokio::test]
async fn test_unpublished_category_page_is_not_found() {
    let app = app().await;
    fixtures::category(app.pool(), "drafts", false).await;
    fixtures::category(app.pool(), "travel", true).await;

    app.server.get("/category/drafts/").await.assert_status_not_found();
    app.server.get("/category/travel/").await.assert_status_ok();
    app.server.get("/category/nope/").await.assert_status_not_found();
}

#[tokio::test]
async fn test_static_pages_and_unknown_route() {
    let app = app().await;

    let about = app.server.get("/pages/about/").await;
    about.assert_status_ok();
    assert!(about.text().contains("Test Blog"));
    app.server.get("/pages/rules/").await.assert_status_ok();

    let response = app.server.get("/no/such/page/").await;
    response.assert_status_not_found();
    assert!(response.text().contains("Page not found"));
}

#[tokio::test]
async fn test_admin_requires_staff() {
    let app = app().await;
    // the first registered user becomes staff
    let (staff, staff_cookie) = login_as(&app, "boss").await;
    assert!(staff.is_staff);
    let (_, cookie) = login_as(&app, "anna").await;

    app.server
        .get("/admin/categories")
        .await
        .assert_status_unauthorized();
    app.server
        .get("/admin/categories")
        .add_header(header::COOKIE, cookie)
        .await
        .assert_status_forbidden();

    let response = app
        .server
        .post("/admin/categories")
        .add_header(header::COOKIE, staff_cookie.clone())
        .json(&serde_json::json!({ "title": "Travel", "slug": "travel" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["slug"], "travel");

    let response = app
        .server
        .post("/admin/categories")
        .add_header(header::COOKIE, staff_cookie.clone())
        .json(&serde_json::json!({ "title": "Again", "slug": "travel" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "CONFLICT");

    let response = app
        .server
        .get("/admin/posts")
        .add_header(header::COOKIE, staff_cookie)
        .await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_admin_lists_hidden_posts() {
    let app = app().await;
    let (staff, staff_cookie) = login_as(&app, "boss").await;
    let post = fixtures::post_in(app.pool(), staff.id, None).await;
    reschedule(app.pool(), post.id, 5).await;

    let page: Value = app
        .server
        .get("/admin/posts")
        .add_header(header::COOKIE, staff_cookie.clone())
        .await
        .json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], post.id);

    let comment = fixtures::comment(app.pool(), post.id, staff.id, "spam").await;
    app.server
        .delete(&format!("/admin/comments/{}", comment.id))
        .add_header(header::COOKIE, staff_cookie.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .delete(&format!("/admin/comments/{}", comment.id))
        .add_header(header::COOKIE, staff_cookie)
        .await
        .assert_status_not_found();
}
