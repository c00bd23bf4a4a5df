//! Staff console endpoints
//!
//! JSON management of the data the public pages only read:
//! - categories and locations CRUD
//! - the unfiltered post listing
//! - comment moderation
//!
//! Mounted under `/admin` behind `require_staff`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::error::ApiError;
use crate::api::middleware::AppState;
use crate::models::{
    Category, CreateCategoryInput, CreateLocationInput, Location, PageRequest, PagedResult,
    PostView, UpdateCategoryInput, UpdateLocationInput,
};

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{id}", put(update_category).delete(delete_category))
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/{id}", put(update_location).delete(delete_location))
        .route("/posts", get(list_posts))
        .route("/comments/{id}", delete(delete_comment))
}

// ============================================================================
// Categories
// ============================================================================

/// GET /admin/categories
async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.category_service.list().await?))
}

/// POST /admin/categories
async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.category_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /admin/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.update(id, body).await?))
}

/// DELETE /admin/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Locations
// ============================================================================

/// GET /admin/locations
async fn list_locations(State(state): State<AppState>) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(state.location_service.list().await?))
}

/// POST /admin/locations
async fn create_location(
    State(state): State<AppState>,
    Json(body): Json<CreateLocationInput>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let location = state.location_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// PUT /admin/locations/{id}
async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateLocationInput>,
) -> Result<Json<Location>, ApiError> {
    Ok(Json(state.location_service.update(id, body).await?))
}

/// DELETE /admin/locations/{id}
async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.location_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Posts and comments
// ============================================================================

/// GET /admin/posts?page=N - every post, hidden ones included
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<PostView>>, ApiError> {
    let page = PageRequest::parse(query.page.as_deref())
        .map_err(|e| ApiError::not_found(e.to_string()))?;
    Ok(Json(state.post_service.list_all(page).await?))
}

/// DELETE /admin/comments/{id}
async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.moderate_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
