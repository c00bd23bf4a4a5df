//! Profile pages

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use tera::Context as TeraContext;

use crate::api::common::{insert_feed, PageQuery};
use crate::api::error::AppError;
use crate::api::middleware::{AppState, PageContext};
use crate::models::{UpdateProfileInput, User};
use crate::services::UserServiceError;

/// GET /profile/{username}/
pub async fn profile(
    State(state): State<AppState>,
    page: PageContext,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let (user, feed) = state
        .post_service
        .profile_feed(&username, query.page_request()?)
        .await?;

    let mut context = TeraContext::new();
    context.insert("profile", &ProfileView::from(&user));
    context.insert("is_owner", &page.actor.is(user.id));
    insert_feed(&mut context, &feed);
    state.render(&page, "blog/profile.html", &context)
}

/// GET /profile/{username}/edit/
pub async fn edit_form(
    State(state): State<AppState>,
    page: PageContext,
    Path(username): Path<String>,
) -> Result<Html<String>, AppError> {
    page.require_user()?;
    let user = state.user_service.get_for_edit(&username, &page.actor).await?;
    render_form(&state, &page, &username, &UpdateProfileInput::from_user(&user), &[])
}

/// POST /profile/{username}/edit/
pub async fn edit_profile(
    State(state): State<AppState>,
    page: PageContext,
    Path(username): Path<String>,
    Form(input): Form<UpdateProfileInput>,
) -> Result<Response, AppError> {
    page.require_user()?;

    match state
        .user_service
        .update_profile(&username, &page.actor, input.clone())
        .await
    {
        Ok(user) => Ok(Redirect::to(&format!("/profile/{}/", user.username)).into_response()),
        Err(e @ (UserServiceError::ValidationError(_) | UserServiceError::UserExists(_))) => {
            Ok(render_form(&state, &page, &username, &input, &e.messages())?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

fn render_form(
    state: &AppState,
    page: &PageContext,
    username: &str,
    form: &UpdateProfileInput,
    errors: &[String],
) -> Result<Html<String>, AppError> {
    let mut context = TeraContext::new();
    context.insert("username", username);
    context.insert("form", form);
    context.insert("errors", errors);
    state.render(page, "blog/user.html", &context)
}

/// Public part of a user for the profile page
#[derive(Debug, serde::Serialize)]
struct ProfileView<'a> {
    id: i64,
    username: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    full_name: String,
    date_joined: String,
}

impl<'a> From<&'a User> for ProfileView<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: user.id,
            username: &user.username,
            first_name: &user.first_name,
            last_name: &user.last_name,
            full_name: user.display_name(),
            date_joined: user.date_joined.format("%d %B %Y").to_string(),
        }
    }
}
