//! Request-boundary errors
//!
//! [`AppError`] is what HTML handlers return. Error statuses leave the
//! handler with an empty body and an [`ErrorPage`] marker; the
//! `error_pages` middleware renders the matching template. [`ApiError`] is
//! the JSON error body of the staff console.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::InvalidPage;
use crate::services::{
    CategoryServiceError, CommentServiceError, LocationServiceError, PostServiceError,
    UserServiceError,
};

/// Error returned by page handlers
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    /// 303 to the given location
    #[error("Redirect to {0}")]
    Redirect(String),

    /// Anonymous request to a page that needs a login
    #[error("Login required for {next}")]
    LoginRequired { next: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Marker left on error responses for the `error_pages` middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage {
    pub status: StatusCode,
}

impl ErrorPage {
    pub fn template(&self) -> &'static str {
        match self.status {
            StatusCode::FORBIDDEN => "pages/403.html",
            StatusCode::NOT_FOUND => "pages/404.html",
            _ => "pages/500.html",
        }
    }

    pub fn title(&self) -> &'static str {
        match self.status {
            StatusCode::FORBIDDEN => "Access denied",
            StatusCode::NOT_FOUND => "Page not found",
            _ => "Server error",
        }
    }
}

/// Login URL that comes back to `next` afterwards
pub fn login_url(next: &str) -> String {
    format!("/auth/login/?next={}", urlencoding::encode(next))
}

fn error_page(status: StatusCode) -> Response {
    let mut response = status.into_response();
    response.extensions_mut().insert(ErrorPage { status });
    response
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => error_page(StatusCode::NOT_FOUND),
            AppError::Forbidden => error_page(StatusCode::FORBIDDEN),
            AppError::Redirect(to) => Redirect::to(&to).into_response(),
            AppError::LoginRequired { next } => Redirect::to(&login_url(&next)).into_response(),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                error_page(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl From<InvalidPage> for AppError {
    fn from(_: InvalidPage) -> Self {
        AppError::NotFound
    }
}

impl From<PostServiceError> for AppError {
    fn from(err: PostServiceError) -> Self {
        match err {
            PostServiceError::NotFound(_) | PostServiceError::InvalidPage(_) => AppError::NotFound,
            PostServiceError::Forbidden => AppError::Forbidden,
            PostServiceError::RedirectToPost(id) => AppError::Redirect(format!("/posts/{}/", id)),
            PostServiceError::ValidationError(messages) => AppError::BadRequest(messages.join(" ")),
            PostServiceError::InternalError(e) => AppError::Internal(e),
        }
    }
}

impl From<CommentServiceError> for AppError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::NotFound(_) => AppError::NotFound,
            CommentServiceError::Forbidden => AppError::Forbidden,
            CommentServiceError::ValidationError(message) => AppError::BadRequest(message),
            CommentServiceError::InternalError(e) => AppError::Internal(e),
        }
    }
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound(_) => AppError::NotFound,
            UserServiceError::Forbidden => AppError::Forbidden,
            UserServiceError::InternalError(e) => AppError::Internal(e),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

/// Error response for the JSON console
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(err: CategoryServiceError) -> Self {
        match err {
            CategoryServiceError::NotFound(msg) => ApiError::not_found(format!("Category not found: {}", msg)),
            CategoryServiceError::DuplicateSlug(slug) => {
                ApiError::conflict(format!("Category slug already exists: {}", slug))
            }
            CategoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CategoryServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<LocationServiceError> for ApiError {
    fn from(err: LocationServiceError) -> Self {
        match err {
            LocationServiceError::NotFound(msg) => ApiError::not_found(format!("Location not found: {}", msg)),
            LocationServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            LocationServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(err: PostServiceError) -> Self {
        match err {
            PostServiceError::InvalidPage(e) => ApiError::not_found(e.to_string()),
            PostServiceError::InternalError(e) => internal(e),
            other => ApiError::validation_error(other.to_string()),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::NotFound(msg) => ApiError::not_found(format!("Not found: {}", msg)),
            CommentServiceError::InternalError(e) => internal(e),
            other => ApiError::validation_error(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        internal(e)
    }
}

fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("Console request failed: {:#}", e);
    ApiError::internal_error("Internal server error")
}
