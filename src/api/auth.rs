//! Authentication pages
//!
//! Handles:
//! - /auth/login/ - login form, honours a local `next`
//! - /auth/logout/ - drops the session
//! - /auth/registration/ - sign-up form
//! - /auth/password_change/ - password change for the logged-in user

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::common::safe_next;
use crate::api::error::AppError;
use crate::api::middleware::{
    clear_session_cookie, cookie_header, session_cookie, session_token, AppState, PageContext,
};
use crate::services::{ChangePasswordInput, LoginInput, RegisterInput, UserServiceError};

/// `?next=` of the login page
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Body of the login form
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Build the auth routes open to anyone
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/login/", get(login_form).post(login))
        .route("/logout/", get(logout).post(logout))
        .route("/registration/", get(registration_form).post(registration))
}

/// Build the auth routes that need a login
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/password_change/", get(password_change_form).post(password_change))
}

/// GET /auth/login/
async fn login_form(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<NextQuery>,
) -> Result<Html<String>, AppError> {
    render_login(&state, &page, "", query.next.as_deref(), &[])
}

/// POST /auth/login/
async fn login(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let next = form.next.clone().or(query.next).filter(|n| !n.is_empty());
    let input = LoginInput {
        username: form.username.clone(),
        password: form.password,
    };

    match state.user_service.login(input).await {
        Ok((_, session)) => {
            let mut headers = HeaderMap::new();
            headers.insert(header::SET_COOKIE, cookie_header(&session_cookie(&session))?);
            let target = safe_next(next.as_deref()).unwrap_or("/");
            Ok((headers, Redirect::to(target)).into_response())
        }
        Err(UserServiceError::AuthenticationError(message)) => {
            Ok(render_login(&state, &page, &form.username, next.as_deref(), &[message])?
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET|POST /auth/logout/
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, cookie_header(&clear_session_cookie())?);
    Ok((response_headers, Redirect::to("/")).into_response())
}

/// GET /auth/registration/
async fn registration_form(
    State(state): State<AppState>,
    page: PageContext,
) -> Result<Html<String>, AppError> {
    render_registration(&state, &page, "", &[])
}

/// POST /auth/registration/
async fn registration(
    State(state): State<AppState>,
    page: PageContext,
    Form(input): Form<RegisterInput>,
) -> Result<Response, AppError> {
    let username = input.username.clone();

    match state.user_service.register(input).await {
        Ok(_) => Ok(Redirect::to("/auth/login/").into_response()),
        Err(e @ (UserServiceError::ValidationError(_) | UserServiceError::UserExists(_))) => {
            Ok(render_registration(&state, &page, &username, &e.messages())?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /auth/password_change/
async fn password_change_form(
    State(state): State<AppState>,
    page: PageContext,
) -> Result<Html<String>, AppError> {
    page.require_user()?;
    render_password_change(&state, &page, &[])
}

/// POST /auth/password_change/
async fn password_change(
    State(state): State<AppState>,
    page: PageContext,
    Form(input): Form<ChangePasswordInput>,
) -> Result<Response, AppError> {
    let user = page.require_user()?.clone();

    match state.user_service.change_password(&user, input).await {
        Ok(()) => Ok(state
            .render(&page, "registration/password_change_done.html", &TeraContext::new())?
            .into_response()),
        Err(UserServiceError::ValidationError(problems)) => {
            Ok(render_password_change(&state, &page, &problems)?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

fn render_login(
    state: &AppState,
    page: &PageContext,
    username: &str,
    next: Option<&str>,
    errors: &[String],
) -> Result<Html<String>, AppError> {
    let mut context = TeraContext::new();
    context.insert("username", username);
    context.insert("next", &safe_next(next));
    context.insert("errors", errors);
    state.render(page, "registration/login.html", &context)
}

fn render_registration(
    state: &AppState,
    page: &PageContext,
    username: &str,
    errors: &[String],
) -> Result<Html<String>, AppError> {
    let mut context = TeraContext::new();
    context.insert("username", username);
    context.insert("errors", errors);
    state.render(page, "registration/registration_form.html", &context)
}

fn render_password_change(
    state: &AppState,
    page: &PageContext,
    errors: &[String],
) -> Result<Html<String>, AppError> {
    let mut context = TeraContext::new();
    context.insert("errors", errors);
    state.render(page, "registration/password_change_form.html", &context)
}
