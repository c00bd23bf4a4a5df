//! Data models
//!
//! Database entities (User, Session, Category, Location, Post, Comment),
//! the joined views the pages render, mutation inputs and pagination types.

mod category;
mod comment;
mod location;
mod pagination;
mod post;
mod session;
mod user;

pub use category::{
    is_valid_slug, Category, CreateCategoryInput, UpdateCategoryInput, CATEGORY_TITLE_MAX_LEN,
};
pub use comment::{Comment, CommentInput, CommentWithAuthor};
pub use location::{CreateLocationInput, Location, UpdateLocationInput, LOCATION_NAME_MAX_LEN};
pub use pagination::{page_count, InvalidPage, ListParams, PageInfo, PageRequest, PagedResult};
pub use post::{
    ImageUpdate, Post, PostAuthor, PostCategory, PostInput, PostLocation, PostView,
    POST_TITLE_MAX_LEN,
};
pub use session::Session;
pub use user::{is_valid_username, UpdateProfileInput, User, USERNAME_MAX_LEN};
