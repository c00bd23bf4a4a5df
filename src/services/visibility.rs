//! Post visibility
//!
//! A post is effectively published when its flag is set, its publication
//! time has passed and its category (if any) is published. Feeds only ever
//! show effectively published posts; the author additionally sees their own
//! posts on the detail page whatever their state.
//!
//! The same predicate exists in SQL as
//! [`PUBLISHED_FILTER`](crate::db::repositories::PUBLISHED_FILTER); the two
//! are checked against each other in the tests below.

use chrono::{DateTime, Utc};

use crate::models::{Post, PostView};
use crate::services::policy::Actor;

/// The effectively-published predicate.
///
/// `category_published` is `None` when the post has no category.
pub fn is_effectively_published(
    post: &Post,
    category_published: Option<bool>,
    now: DateTime<Utc>,
) -> bool {
    post.is_published && post.pub_date <= now && category_published.unwrap_or(true)
}

/// Whether `viewer` may open the post
pub fn can_view(viewer: &Actor, view: &PostView, now: DateTime<Utc>) -> bool {
    viewer.is(view.post.author_id)
        || is_effectively_published(&view.post, view.category_published(), now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use crate::db::repositories::{PostRepository, PostScope, SqlxPostRepository};
    use crate::models::{ListParams, PostAuthor, PostCategory, PostInput, User};
    use chrono::{Duration, SubsecRound};
    use proptest::prelude::*;

    fn view(author_id: i64, is_published: bool, pub_date: DateTime<Utc>, category: Option<bool>) -> PostView {
        PostView {
            post: Post {
                id: 1,
                title: "t".into(),
                text: "x".into(),
                image: None,
                pub_date,
                is_published,
                created_at: pub_date,
                author_id,
                location_id: None,
                category_id: category.map(|_| 3),
            },
            author: PostAuthor {
                id: author_id,
                username: "anna".into(),
                first_name: String::new(),
                last_name: String::new(),
            },
            category: category.map(|is_published| PostCategory {
                id: 3,
                title: "Travel".into(),
                slug: "travel".into(),
                is_published,
            }),
            location: None,
            comment_count: 0,
        }
    }

    fn actor(id: i64) -> Actor {
        let mut user = User::new(format!("user{}", id), "hash".into(), false);
        user.id = id;
        Actor::User(user)
    }

    #[test]
    fn test_predicate_clauses() {
        let now = Utc::now();
        let past = now - Duration::hours(1);

        assert!(is_effectively_published(&view(1, true, past, None).post, None, now));
        assert!(is_effectively_published(&view(1, true, now, None).post, Some(true), now));
        assert!(!is_effectively_published(&view(1, false, past, None).post, None, now));
        assert!(!is_effectively_published(&view(1, true, now + Duration::seconds(1), None).post, None, now));
        assert!(!is_effectively_published(&view(1, true, past, None).post, Some(false), now));
    }

    #[test]
    fn test_author_sees_hidden_post() {
        let now = Utc::now();
        let scheduled = view(1, true, now + Duration::days(1), None);

        assert!(can_view(&actor(1), &scheduled, now));
        assert!(!can_view(&actor(2), &scheduled, now));
        assert!(!can_view(&Actor::Anonymous, &scheduled, now));

        let in_closed_category = view(1, true, now - Duration::days(1), Some(false));
        assert!(can_view(&actor(1), &in_closed_category, now));
        assert!(!can_view(&Actor::Anonymous, &in_closed_category, now));
    }

    #[derive(Debug, Clone)]
    struct Row {
        is_published: bool,
        offset_hours: i64,
        // None: no category, Some(flag): category published or not
        category: Option<bool>,
    }

    fn row_strategy() -> impl Strategy<Value = Row> {
        (any::<bool>(), -48i64..48, prop::option::of(any::<bool>())).prop_map(
            |(is_published, offset_hours, category)| Row {
                is_published,
                offset_hours,
                category,
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_sql_filter_matches_predicate(rows in prop::collection::vec(row_strategy(), 0..12)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build runtime");

            let (listed, expected, counted) = runtime.block_on(async {
                let pool = fixtures::migrated_pool().await;
                let author = fixtures::user(&pool, "anna").await;
                let open = fixtures::category(&pool, "open", true).await;
                let closed = fixtures::category(&pool, "closed", false).await;
                let repo = SqlxPostRepository::boxed(pool);
                let now = Utc::now().trunc_subsecs(0);

                let mut expected = Vec::new();
                for row in &rows {
                    let mut input = PostInput::new("t", "x")
                        .with_published(row.is_published)
                        .with_pub_date(now + Duration::hours(row.offset_hours));
                    match row.category {
                        Some(true) => input = input.with_category(open.id),
                        Some(false) => input = input.with_category(closed.id),
                        None => {}
                    }
                    let post = repo.create(author.id, &input).await.expect("Failed to create post");
                    if is_effectively_published(&post, row.category, now) {
                        expected.push(post.id);
                    }
                }

                let feed = repo
                    .list_published(PostScope::All, now, &ListParams::new(1, 100))
                    .await
                    .expect("Failed to list");
                let mut listed: Vec<i64> = feed.iter().map(|v| v.post.id).collect();
                listed.sort_unstable();

                let counted = repo.count_published(PostScope::All, now).await.expect("Failed to count");
                (listed, expected, counted)
            });

            prop_assert_eq!(counted as usize, expected.len());
            prop_assert_eq!(listed, expected);
        }
    }
}
