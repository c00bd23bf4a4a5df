//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They:
//! - apply the visibility rules to every public read
//! - run the ownership check before every mutation
//! - validate form input

pub mod category;
pub mod comment;
pub mod location;
pub mod password;
pub mod policy;
pub mod post;
pub mod user;
pub mod visibility;

pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use location::{LocationService, LocationServiceError};
pub use password::{hash_password, verify_password};
pub use policy::{authorize, Action, Actor, Denial, Target};
pub use post::{FormChoices, PostService, PostServiceError};
pub use user::{
    ChangePasswordInput, LoginInput, RegisterInput, UserService, UserServiceError,
};
pub use visibility::{can_view, is_effectively_published};
