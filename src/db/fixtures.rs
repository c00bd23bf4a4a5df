//! Row builders shared by the test modules

use chrono::Utc;

use super::{create_test_pool, migrations, DbPool};
use crate::models::{Category, Comment, Post, User};

/// In-memory pool with the schema applied
pub async fn migrated_pool() -> DbPool {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Insert a non-staff user with a dummy password hash
pub async fn user(pool: &DbPool, username: &str) -> User {
    let user = User::new(username.to_string(), "not-a-hash".to_string(), false);
    let id = sqlx::query("INSERT INTO users (username, password_hash, is_staff, date_joined) VALUES (?, ?, ?, ?)")
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(user.date_joined)
        .execute(pool)
        .await
        .expect("Failed to insert user")
        .last_insert_rowid();
    User { id, ..user }
}

/// Insert a category whose title is derived from the slug
pub async fn category(pool: &DbPool, slug: &str, is_published: bool) -> Category {
    let now = Utc::now();
    let id = sqlx::query("INSERT INTO categories (title, description, slug, is_published, created_at) VALUES (?, '', ?, ?, ?)")
        .bind(slug.to_uppercase())
        .bind(slug)
        .bind(is_published)
        .bind(now)
        .execute(pool)
        .await
        .expect("Failed to insert category")
        .last_insert_rowid();
    Category {
        id,
        title: slug.to_uppercase(),
        description: String::new(),
        slug: slug.to_string(),
        is_published,
        created_at: now,
    }
}

/// Insert a published post dated now
pub async fn post_in(pool: &DbPool, author_id: i64, category_id: Option<i64>) -> Post {
    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO posts (title, text, pub_date, is_published, created_at, author_id, category_id) VALUES ('Title', 'Text', ?, 1, ?, ?, ?)",
    )
    .bind(now)
    .bind(now)
    .bind(author_id)
    .bind(category_id)
    .execute(pool)
    .await
    .expect("Failed to insert post")
    .last_insert_rowid();

    Post {
        id,
        title: "Title".to_string(),
        text: "Text".to_string(),
        image: None,
        pub_date: now,
        is_published: true,
        created_at: now,
        author_id,
        location_id: None,
        category_id,
    }
}

/// Insert a comment
pub async fn comment(pool: &DbPool, post_id: i64, author_id: i64, text: &str) -> Comment {
    let now = Utc::now();
    let id = sqlx::query("INSERT INTO comments (text, post_id, author_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(text)
        .bind(post_id)
        .bind(author_id)
        .bind(now)
        .execute(pool)
        .await
        .expect("Failed to insert comment")
        .last_insert_rowid();
    Comment {
        id,
        text: text.to_string(),
        post_id,
        author_id,
        created_at: now,
    }
}
