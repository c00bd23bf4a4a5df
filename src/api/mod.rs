//! API layer - HTTP handlers and routing
//!
//! This module contains every HTTP endpoint of Blogicum:
//! - Post feed, detail and post forms
//! - Comment forms
//! - Profile and category feeds
//! - Login, logout, registration and password change
//! - Static pages
//! - The staff JSON console under `/admin`
//! - Uploaded media under `/media`

pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod error;
pub mod middleware;
pub mod pages;
pub mod posts;
pub mod profile;
pub mod upload;

#[cfg(test)]
mod tests;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use error::{ApiError, AppError};
pub use middleware::{AppState, AuthenticatedUser, PageContext};

/// Room for the text fields of a post form on top of the image
const FORM_OVERHEAD: usize = 64 * 1024;

/// Build the page routes
pub fn build_page_router() -> Router<AppState> {
    // Routes that need a logged-in user
    let protected_routes = Router::new()
        .route("/posts/create/", get(posts::create_form).post(posts::create_post))
        .route("/posts/{id}/edit/", get(posts::edit_form).post(posts::edit_post))
        .route("/posts/{id}/delete/", get(posts::delete_form).post(posts::delete_post))
        .route("/posts/{id}/comment/", get(comments::add_form).post(comments::add_comment))
        .route(
            "/posts/{id}/edit_comment/{comment_id}/",
            get(comments::edit_form).post(comments::edit_comment),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}/",
            get(comments::delete_form).post(comments::delete_comment),
        )
        .route("/profile/{username}/edit/", get(profile::edit_form).post(profile::edit_profile))
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn(middleware::require_login));

    // Public routes
    Router::new()
        .route("/", get(posts::index))
        .route("/posts/{id}/", get(posts::detail))
        .route("/profile/{username}/", get(profile::profile))
        .route("/category/{slug}/", get(categories::category_posts))
        .route("/pages/about/", get(pages::about))
        .route("/pages/rules/", get(pages::rules))
        .nest("/auth", auth::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.upload_config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);

    let admin_routes = admin::router()
        .route_layer(axum_middleware::from_fn(middleware::require_staff));

    Router::new()
        .merge(build_page_router())
        .nest("/admin", admin_routes)
        .nest_service("/media", ServeDir::new(&state.upload_config.path))
        .fallback(pages::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::optional_auth,
                ))
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::error_pages,
                ))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
