//! Ownership rules for mutations
//!
//! Every edit or delete goes through [`authorize`]: look the target up, then
//! compare the acting user with the stored owner before touching anything.

use crate::models::{Comment, Post, User};

/// Who is performing a request
#[derive(Debug, Clone, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    User(User),
}

impl Actor {
    pub fn user(&self) -> Option<&User> {
        match self {
            Actor::Anonymous => None,
            Actor::User(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::User(_))
    }

    /// True when the actor is the user with `user_id`
    pub fn is(&self, user_id: i64) -> bool {
        self.user_id() == Some(user_id)
    }
}

impl From<Option<User>> for Actor {
    fn from(user: Option<User>) -> Self {
        user.map_or(Actor::Anonymous, Actor::User)
    }
}

/// The entity a mutation is aimed at, reduced to what the check needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Post { id: i64, author_id: i64 },
    Comment { post_id: i64, author_id: i64 },
    Profile { user_id: i64 },
}

impl Target {
    fn owner_id(&self) -> i64 {
        match *self {
            Target::Post { author_id, .. } | Target::Comment { author_id, .. } => author_id,
            Target::Profile { user_id } => user_id,
        }
    }
}

impl From<&Post> for Target {
    fn from(post: &Post) -> Self {
        Target::Post {
            id: post.id,
            author_id: post.author_id,
        }
    }
}

impl From<&Comment> for Target {
    fn from(comment: &Comment) -> Self {
        Target::Comment {
            post_id: comment.post_id,
            author_id: comment.author_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
}

/// How a refused mutation is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Send the actor back to the post page
    RedirectToPost(i64),
    /// 403
    Forbidden,
}

/// Decide whether `actor` may perform `action` on `target`.
///
/// Only the owner may edit or delete. A refused post edit sends the actor
/// back to the post; every other refusal is forbidden.
pub fn authorize(actor: &Actor, target: Target, action: Action) -> Result<(), Denial> {
    if actor.is(target.owner_id()) {
        return Ok(());
    }

    tracing::debug!(
        actor = ?actor.user_id(),
        ?target,
        ?action,
        "Mutation denied"
    );

    match (target, action) {
        (Target::Post { id, .. }, Action::Edit) => Err(Denial::RedirectToPost(id)),
        _ => Err(Denial::Forbidden),
    }
}
