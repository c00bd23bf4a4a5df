//! Post pages
//!
//! Home feed, detail page and the create / edit / delete forms.

use axum::{
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::Context as TeraContext;

use crate::api::common::{
    insert_feed, parse_optional_id, resolve_pub_date, PageQuery, PostFormValues,
};
use crate::api::error::AppError;
use crate::api::middleware::{AppState, PageContext};
use crate::api::upload::{self, MultipartForm};
use crate::models::{ImageUpdate, PostInput};
use crate::services::PostServiceError;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum FormMode {
    Create,
    Edit,
    Delete,
}

/// GET / - home feed
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let feed = state.post_service.feed(query.page_request()?).await?;

    let mut context = TeraContext::new();
    insert_feed(&mut context, &feed);
    state.render(&page, "blog/index.html", &context)
}

/// GET /posts/{id}/ - one post with its comments
pub async fn detail(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let post = state.post_service.get_for_viewer(id, &page.actor).await?;
    let comments = state.comment_service.list_for_post(id).await?;

    let mut context = TeraContext::new();
    context.insert("is_author", &page.actor.is(post.post.author_id));
    context.insert("post", &post);
    context.insert("comments", &comments);
    state.render(&page, "blog/detail.html", &context)
}

/// GET /posts/create/
pub async fn create_form(
    State(state): State<AppState>,
    page: PageContext,
) -> Result<Html<String>, AppError> {
    page.require_user()?;
    render_form(&state, &page, FormMode::Create, None, &PostFormValues::blank(), &[]).await
}

/// POST /posts/create/
pub async fn create_post(
    State(state): State<AppState>,
    page: PageContext,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let user = page.require_user()?.clone();
    let form = upload::read_form(multipart).await?;

    let values = form_values(&form, None);
    let (input, errors) = post_input(&state, &form, None);
    if !errors.is_empty() {
        return Ok(render_form(&state, &page, FormMode::Create, None, &values, &errors)
            .await?
            .into_response());
    }
    let (input, stored) = attach_image(&state, &form, input).await?;

    match state.post_service.create(&user, input).await {
        Ok(_) => Ok(Redirect::to(&format!("/profile/{}/", user.username)).into_response()),
        Err(err) => {
            if let Some(path) = &stored {
                upload::remove_image(&state.upload_config, path).await;
            }
            match err {
                PostServiceError::ValidationError(problems) => Ok(render_form(
                    &state,
                    &page,
                    FormMode::Create,
                    None,
                    &values,
                    &problems,
                )
                .await?
                .into_response()),
                other => Err(other.into()),
            }
        }
    }
}

/// GET /posts/{id}/edit/
pub async fn edit_form(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    page.require_user()?;
    let post = state.post_service.get_for_edit(id, &page.actor).await?;
    render_form(&state, &page, FormMode::Edit, Some(id), &PostFormValues::from_post(&post), &[]).await
}

/// POST /posts/{id}/edit/
pub async fn edit_post(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    page.require_user()?;
    let current = state.post_service.get_for_edit(id, &page.actor).await?;
    let form = upload::read_form(multipart).await?;

    let values = form_values(&form, current.image.clone());
    let (input, errors) = post_input(&state, &form, Some(current.pub_date));
    if !errors.is_empty() {
        return Ok(render_form(&state, &page, FormMode::Edit, Some(id), &values, &errors)
            .await?
            .into_response());
    }
    let (mut input, stored) = attach_image(&state, &form, input).await?;
    if stored.is_none() && form.checked("clear_image") {
        input.image = ImageUpdate::Clear;
    }

    match state.post_service.update(id, &page.actor, input).await {
        Ok(updated) => {
            if let Some(old) = current.image.as_deref() {
                if updated.image.as_deref() != Some(old) {
                    upload::remove_image(&state.upload_config, old).await;
                }
            }
            Ok(Redirect::to(&format!("/posts/{}/", id)).into_response())
        }
        Err(err) => {
            if let Some(path) = &stored {
                upload::remove_image(&state.upload_config, path).await;
            }
            match err {
                PostServiceError::ValidationError(problems) => Ok(render_form(
                    &state,
                    &page,
                    FormMode::Edit,
                    Some(id),
                    &values,
                    &problems,
                )
                .await?
                .into_response()),
                other => Err(other.into()),
            }
        }
    }
}

/// GET /posts/{id}/delete/ - confirmation page
pub async fn delete_form(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    page.require_user()?;
    let post = state.post_service.get_for_delete(id, &page.actor).await?;
    render_form(&state, &page, FormMode::Delete, Some(id), &PostFormValues::from_post(&post), &[]).await
}

/// POST /posts/{id}/delete/
pub async fn delete_post(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    page.require_user()?;
    let deleted = state.post_service.delete(id, &page.actor).await?;
    if let Some(image) = deleted.image.as_deref() {
        upload::remove_image(&state.upload_config, image).await;
    }
    Ok(Redirect::to("/"))
}

async fn render_form(
    state: &AppState,
    page: &PageContext,
    mode: FormMode,
    post_id: Option<i64>,
    values: &PostFormValues,
    errors: &[String],
) -> Result<Html<String>, AppError> {
    let choices = state.post_service.form_choices().await?;

    let mut context = TeraContext::new();
    context.insert("mode", &mode);
    context.insert("post_id", &post_id);
    context.insert("form", values);
    context.insert("errors", errors);
    context.insert("categories", &choices.categories);
    context.insert("locations", &choices.locations);
    state.render(page, "blog/create.html", &context)
}

/// Form fields as typed, for re-rendering after an error
fn form_values(form: &MultipartForm, image: Option<String>) -> PostFormValues {
    PostFormValues {
        title: form.text("title").to_string(),
        text: form.text("text").to_string(),
        pub_date: form.text("pub_date").to_string(),
        is_published: form.checked("is_published"),
        location_id: parse_optional_id(form.text("location"), "location").ok().flatten(),
        category_id: parse_optional_id(form.text("category"), "category").ok().flatten(),
        image,
    }
}

/// Parse the text fields; the image is handled separately
fn post_input(
    state: &AppState,
    form: &MultipartForm,
    stored_pub_date: Option<DateTime<Utc>>,
) -> (PostInput, Vec<String>) {
    let mut errors = Vec::new();
    let mut input = PostInput::new(form.text("title"), form.text("text"))
        .with_published(form.checked("is_published"));

    match resolve_pub_date(form.text("pub_date"), stored_pub_date) {
        Ok(pub_date) => input.pub_date = pub_date,
        Err(e) => errors.push(e),
    }
    match parse_optional_id(form.text("category"), "category") {
        Ok(id) => input.category_id = id,
        Err(e) => errors.push(e),
    }
    match parse_optional_id(form.text("location"), "location") {
        Ok(id) => input.location_id = id,
        Err(e) => errors.push(e),
    }
    if let Some(image) = &form.image {
        if let Some(problem) = upload::check_image(&state.upload_config, image) {
            errors.push(problem);
        }
    }

    (input, errors)
}

/// Store an uploaded image and point the input at it
async fn attach_image(
    state: &AppState,
    form: &MultipartForm,
    input: PostInput,
) -> Result<(PostInput, Option<String>), AppError> {
    match &form.image {
        Some(image) => {
            let path = upload::store_image(&state.upload_config, image).await?;
            Ok((input.with_image(ImageUpdate::Set(path.clone())), Some(path)))
        }
        None => Ok((input, None)),
    }
}
