//! Category feed page

use axum::{
    extract::{Path, Query, State},
    response::Html,
};
use tera::Context as TeraContext;

use crate::api::common::{insert_feed, PageQuery};
use crate::api::error::AppError;
use crate::api::middleware::{AppState, PageContext};

/// GET /category/{slug}/
pub async fn category_posts(
    State(state): State<AppState>,
    page: PageContext,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let (category, feed) = state
        .post_service
        .category_feed(&slug, query.page_request()?)
        .await?;

    let mut context = TeraContext::new();
    context.insert("category", &category);
    insert_feed(&mut context, &feed);
    state.render(&page, "blog/category.html", &context)
}
