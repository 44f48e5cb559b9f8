use crate::server::{
    RateLimiter, Result, ServerError, ServerRouter, auth::AuthenticatedUser,
    authors::attach_authors, json::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use piepmatz_common::model::{
    Id,
    post::{Post, PostContent, PostMarker, PostWithAuthor},
};
use piepmatz_db::client::DbClient;
use piepmatz_directory::client::DirectoryClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_posts)
        .typed_get(get_post)
        .typed_post(create_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct GetPostsPath();

async fn get_posts(
    GetPostsPath(): GetPostsPath,
    State(db): State<Arc<DbClient>>,
    State(directory): State<Arc<DirectoryClient>>,
) -> Result<Json<Vec<PostWithAuthor>>> {
    let posts = db.fetch_recent_posts().await?;
    let posts = attach_authors(&directory, posts).await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct GetPostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(db): State<Arc<DbClient>>,
    State(directory): State<Arc<DirectoryClient>>,
) -> Result<Json<PostWithAuthor>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let mut joined = attach_authors(&directory, vec![post]).await?;
    let post = joined.pop().ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct CreatePostRequest {
    content: String,
}

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(db): State<Arc<DbClient>>,
    State(rate_limiter): State<RateLimiter>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<Json<Post>> {
    // Validation first, nothing is counted or written for bad content.
    let content = PostContent::new(request.content)?;

    if !rate_limiter.check(user.user_id()).await? {
        return Err(ServerError::RateLimitExceeded);
    }

    let post = db.create_post(user.user_id(), &content).await?;

    Ok(Json(post))
}
