//! Static pages

use axum::{extract::State, response::Html};
use tera::Context as TeraContext;

use crate::api::error::AppError;
use crate::api::middleware::{AppState, PageContext};

/// GET /pages/about/
pub async fn about(State(state): State<AppState>, page: PageContext) -> Result<Html<String>, AppError> {
    state.render(&page, "pages/about.html", &TeraContext::new())
}

/// GET /pages/rules/
pub async fn rules(State(state): State<AppState>, page: PageContext) -> Result<Html<String>, AppError> {
    state.render(&page, "pages/rules.html", &TeraContext::new())
}

/// Fallback for unknown routes
pub async fn not_found() -> AppError {
    AppError::NotFound
}
