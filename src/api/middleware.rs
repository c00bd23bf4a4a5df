//! Request middleware and shared state
//!
//! Contains middleware for:
//! - Session resolution (`optional_auth`)
//! - Login and staff gates
//! - Error page rendering

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::api::error::{ApiError, AppError, ErrorPage};
use crate::config::{BlogConfig, Config, UploadConfig};
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxCommentRepository, SqlxLocationRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DbPool;
use crate::models::{Session, User};
use crate::services::{
    Actor, CategoryService, CommentService, LocationService, PostService, UserService,
};
use crate::theme::{CurrentUser, StandardTemplateVars, ThemeEngine};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub category_service: Arc<CategoryService>,
    pub location_service: Arc<LocationService>,
    pub theme_engine: Arc<ThemeEngine>,
    pub blog_config: Arc<BlogConfig>,
    pub upload_config: Arc<UploadConfig>,
}

impl AppState {
    /// Wire repositories, services and the template engine over `pool`
    pub fn new(pool: DbPool, config: &Config) -> anyhow::Result<Self> {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let location_repo = SqlxLocationRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());

        let theme_engine = ThemeEngine::new(Some(config.theme.path.as_path()))?;

        Ok(Self {
            user_service: Arc::new(UserService::with_session_expiration(
                user_repo.clone(),
                session_repo,
                config.session.expiration_days,
            )),
            post_service: Arc::new(PostService::new(
                post_repo.clone(),
                category_repo.clone(),
                location_repo.clone(),
                user_repo,
                config.blog.paginate_by,
            )),
            comment_service: Arc::new(CommentService::new(comment_repo, post_repo)),
            category_service: Arc::new(CategoryService::new(category_repo)),
            location_service: Arc::new(LocationService::new(location_repo)),
            theme_engine: Arc::new(theme_engine),
            blog_config: Arc::new(config.blog.clone()),
            upload_config: Arc::new(config.upload.clone()),
            pool,
        })
    }

    /// Render a page template with the standard variables for `page`
    pub fn render(
        &self,
        page: &PageContext,
        template: &str,
        context: &TeraContext,
    ) -> Result<Html<String>, AppError> {
        let html = self
            .theme_engine
            .render_with_standard_vars(template, context, &page.standard_vars(self))?;
        Ok(Html(html))
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Who is asking and for which path; what every page handler needs
#[derive(Debug, Clone)]
pub struct PageContext {
    pub actor: Actor,
    /// Path and query of the request
    pub path: String,
}

impl PageContext {
    pub fn user(&self) -> Option<&User> {
        self.actor.user()
    }

    /// The logged-in user, or a redirect to the login page
    pub fn require_user(&self) -> Result<&User, AppError> {
        self.actor.user().ok_or_else(|| AppError::LoginRequired {
            next: self.path.clone(),
        })
    }

    pub fn standard_vars(&self, state: &AppState) -> StandardTemplateVars {
        StandardTemplateVars::new(state.blog_config.site_name.clone(), self.path.clone())
            .with_user(self.user().map(CurrentUser::from))
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = Actor::from(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|au| au.0.clone()),
        );
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        Ok(Self { actor, path })
    }
}

/// Extract session token from the cookie header
pub fn extract_session_token(request: &Request) -> Option<String> {
    session_token(request.headers())
}

/// Session token carried by `headers`, if any
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_str
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("session="))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// `Set-Cookie` value starting `session`
pub fn session_cookie(session: &Session) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session.id,
        session.max_age_secs()
    )
}

/// `Set-Cookie` value that drops the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Resolve the session cookie on every request.
///
/// A valid session puts [`AuthenticatedUser`] into the request extensions;
/// anything else leaves the request anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(&request) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }
    next.run(request).await
}

/// Send anonymous requests to the login page
pub async fn require_login(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        let next_path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());
        return AppError::LoginRequired { next: next_path }.into_response();
    }
    next.run(request).await
}

/// Staff authorization middleware for the JSON console
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_staff {
        return Err(ApiError::forbidden("Staff privileges required"));
    }

    Ok(next.run(request).await)
}

/// Turn marked error responses into rendered error pages
pub async fn error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let page_context = PageContext {
        actor: Actor::from(
            request
                .extensions()
                .get::<AuthenticatedUser>()
                .map(|au| au.0.clone()),
        ),
        path: request.uri().path().to_string(),
    };

    let response = next.run(request).await;
    let Some(page) = response.extensions().get::<ErrorPage>().copied() else {
        return response;
    };

    let mut context = TeraContext::new();
    context.insert("status", &page.status.as_u16());
    let html = state.theme_engine.render_or_fallback(
        page.template(),
        &context,
        &page_context.standard_vars(&state),
        page.title(),
    );

    let mut rendered = (page.status, Html(html)).into_response();
    for (name, value) in response.headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
}

/// Header value for a `Set-Cookie` string
pub fn cookie_header(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid cookie value: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_cookie(cookie: &str) -> Request {
        Request::builder()
            .uri("/")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_session_token() {
        let request = request_with_cookie("theme=dark; session=abc-123; other=1");
        assert_eq!(extract_session_token(&request).as_deref(), Some("abc-123"));

        let request = request_with_cookie("session=");
        assert_eq!(extract_session_token(&request), None);

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(extract_session_token(&request), None);
    }

    #[test]
    fn test_session_cookie_format() {
        let session = Session::new(1, 7);
        let cookie = session_cookie(&session);
        assert!(cookie.starts_with(&format!("session={};", session.id)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(clear_session_cookie().ends_with("Max-Age=0"));
    }
}
