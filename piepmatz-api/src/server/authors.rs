use crate::server::{Result, ServerError};
use piepmatz_common::model::{
    post::{Post, PostWithAuthor},
    user::{UserId, UserProfile},
};
use piepmatz_directory::client::DirectoryClient;
use piepmatz_directory::record::DirectoryUserRecord;

/// Joins posts with their authors from the user directory. One batch fetch
/// for the distinct author ids; if any post's author is missing or has no
/// username, the whole batch fails.
pub async fn attach_authors(
    directory: &DirectoryClient,
    posts: Vec<Post>,
) -> Result<Vec<PostWithAuthor>> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let author_ids = distinct_author_ids(&posts);
    let records = directory.fetch_users(&author_ids).await?;

    join_posts_with_records(posts, &records)
}

fn distinct_author_ids(posts: &[Post]) -> Vec<UserId> {
    let mut author_ids: Vec<UserId> = Vec::new();
    for post in posts {
        if !author_ids.contains(&post.author_id) {
            author_ids.push(post.author_id.clone());
        }
    }
    author_ids
}

fn join_posts_with_records(
    posts: Vec<Post>,
    records: &[DirectoryUserRecord],
) -> Result<Vec<PostWithAuthor>> {
    posts
        .into_iter()
        .map(|post| {
            let author = records
                .iter()
                .find(|record| record.id == post.author_id.get())
                .cloned()
                .and_then(|record| UserProfile::try_from(record).ok())
                .ok_or(ServerError::AuthorNotFound(post.id))?;

            Ok(PostWithAuthor { post, author })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::server::ServerError;
    use crate::server::authors::{distinct_author_ids, join_posts_with_records};
    use piepmatz_common::model::post::{Post, PostContent};
    use piepmatz_common::model::user::UserId;
    use piepmatz_directory::record::DirectoryUserRecord;
    use time::macros::datetime;

    fn post(id: u64, author: &str) -> Post {
        Post {
            id: id.into(),
            author_id: UserId::new(author.to_string()).unwrap(),
            content: PostContent::new("🦀".to_string()).unwrap(),
            created_at: datetime!(2025-06-01 12:00 UTC),
        }
    }

    fn record(id: &str, username: Option<&str>) -> DirectoryUserRecord {
        DirectoryUserRecord {
            id: id.to_string(),
            username: username.map(ToOwned::to_owned),
            profile_image_url: format!("https://images.example.com/{id}.png"),
        }
    }

    #[test]
    fn author_ids_are_deduplicated_in_order() {
        let posts = [post(3, "user_b"), post(2, "user_a"), post(1, "user_b")];

        let ids = distinct_author_ids(&posts);

        assert_eq!(
            ids,
            [
                UserId::new("user_b".to_string()).unwrap(),
                UserId::new("user_a".to_string()).unwrap(),
            ]
        );
    }

    #[test]
    fn every_post_gets_its_author() {
        let posts = vec![post(2, "user_b"), post(1, "user_a")];
        let records = [
            record("user_a", Some("anna")),
            record("user_b", Some("ben")),
        ];

        let joined = join_posts_with_records(posts, &records).unwrap();

        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].author.username.get(), "ben");
        assert_eq!(joined[1].author.username.get(), "anna");
        assert_eq!(joined[0].post.id, 2_u64.into());
    }

    #[test]
    fn a_missing_author_fails_the_whole_batch() {
        let posts = vec![post(2, "user_b"), post(1, "user_a")];
        let records = [record("user_a", Some("anna"))];

        let result = join_posts_with_records(posts, &records);

        assert!(matches!(
            result,
            Err(ServerError::AuthorNotFound(id)) if id == 2_u64.into()
        ));
    }

    #[test]
    fn an_author_without_a_username_fails_the_whole_batch() {
        let posts = vec![post(1, "user_a"), post(2, "user_b")];
        let records = [
            record("user_a", Some("anna")),
            record("user_b", None),
        ];

        let result = join_posts_with_records(posts, &records);

        assert!(matches!(
            result,
            Err(ServerError::AuthorNotFound(id)) if id == 2_u64.into()
        ));
    }

    #[test]
    fn empty_batches_join_to_nothing() {
        assert!(join_posts_with_records(Vec::new(), &[]).unwrap().is_empty());
    }
}
