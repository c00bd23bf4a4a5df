//! Comment pages
//!
//! Add, edit and delete forms for comments under a post. Every route
//! addresses the comment through its post.

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::error::AppError;
use crate::api::middleware::{AppState, PageContext};
use crate::models::{CommentInput, PostView};
use crate::services::{Action, CommentServiceError};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum CommentMode {
    Add,
    Edit,
    Delete,
}

/// Body of the comment form
#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

/// GET /posts/{id}/comment/
pub async fn add_form(
    State(state): State<AppState>,
    page: PageContext,
    Path(post_id): Path<i64>,
) -> Result<Html<String>, AppError> {
    page.require_user()?;
    let post = state.comment_service.target_post(post_id, &page.actor).await?;
    render_form(&state, &page, CommentMode::Add, &post, None, "", None)
}

/// POST /posts/{id}/comment/
pub async fn add_comment(
    State(state): State<AppState>,
    page: PageContext,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let user = page.require_user()?.clone();

    match state
        .comment_service
        .create(post_id, &user, CommentInput::new(form.text.as_str()))
        .await
    {
        Ok(_) => Ok(Redirect::to(&detail_url(post_id)).into_response()),
        Err(CommentServiceError::ValidationError(message)) => {
            let post = state.comment_service.target_post(post_id, &page.actor).await?;
            Ok(render_form(&state, &page, CommentMode::Add, &post, None, &form.text, Some(message))?
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/edit_comment/{comment_id}/
pub async fn edit_form(
    State(state): State<AppState>,
    page: PageContext,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Html<String>, AppError> {
    page.require_user()?;
    let (post, comment) = state
        .comment_service
        .get_owned(post_id, comment_id, &page.actor, Action::Edit)
        .await?;
    render_form(&state, &page, CommentMode::Edit, &post, Some(comment_id), &comment.text, None)
}

/// POST /posts/{id}/edit_comment/{comment_id}/
pub async fn edit_comment(
    State(state): State<AppState>,
    page: PageContext,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    page.require_user()?;

    match state
        .comment_service
        .update(post_id, comment_id, &page.actor, CommentInput::new(form.text.as_str()))
        .await
    {
        Ok(_) => Ok(Redirect::to(&detail_url(post_id)).into_response()),
        Err(CommentServiceError::ValidationError(message)) => {
            let (post, _) = state
                .comment_service
                .get_owned(post_id, comment_id, &page.actor, Action::Edit)
                .await?;
            Ok(render_form(
                &state,
                &page,
                CommentMode::Edit,
                &post,
                Some(comment_id),
                &form.text,
                Some(message),
            )?
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/delete_comment/{comment_id}/ - confirmation page
pub async fn delete_form(
    State(state): State<AppState>,
    page: PageContext,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Html<String>, AppError> {
    page.require_user()?;
    let (post, comment) = state
        .comment_service
        .get_owned(post_id, comment_id, &page.actor, Action::Delete)
        .await?;
    render_form(&state, &page, CommentMode::Delete, &post, Some(comment_id), &comment.text, None)
}

/// POST /posts/{id}/delete_comment/{comment_id}/
pub async fn delete_comment(
    State(state): State<AppState>,
    page: PageContext,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Redirect, AppError> {
    page.require_user()?;
    state
        .comment_service
        .delete(post_id, comment_id, &page.actor)
        .await?;
    Ok(Redirect::to(&detail_url(post_id)))
}

fn detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

fn render_form(
    state: &AppState,
    page: &PageContext,
    mode: CommentMode,
    post: &PostView,
    comment_id: Option<i64>,
    text: &str,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    let mut context = TeraContext::new();
    context.insert("mode", &mode);
    context.insert("post", post);
    context.insert("comment_id", &comment_id);
    context.insert("text", text);
    context.insert("errors", &error.into_iter().collect::<Vec<_>>());
    state.render(page, "blog/comment.html", &context)
}
