use crate::server::{
    Result, ServerError, ServerRouter, authors::attach_authors, json::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use piepmatz_common::model::{
    post::PostWithAuthor,
    user::{UserHandle, UserId, UserProfile},
};
use piepmatz_db::client::DbClient;
use piepmatz_directory::client::DirectoryClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_user_posts)
        .typed_get(get_user_by_username)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/posts", rejection(ServerError))]
struct GetUserPostsPath {
    id: UserId,
}

/// An unknown author id is not an error here, the list is just empty.
async fn get_user_posts(
    GetUserPostsPath { id }: GetUserPostsPath,
    State(db): State<Arc<DbClient>>,
    State(directory): State<Arc<DirectoryClient>>,
) -> Result<Json<Vec<PostWithAuthor>>> {
    let posts = db.fetch_posts_by_author(&id).await?;
    let posts = attach_authors(&directory, posts).await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/by-username/{username}", rejection(ServerError))]
struct GetUserByUsernamePath {
    username: UserHandle,
}

async fn get_user_by_username(
    GetUserByUsernamePath { username }: GetUserByUsernamePath,
    State(directory): State<Arc<DirectoryClient>>,
) -> Result<Json<UserProfile>> {
    let user = directory
        .fetch_user_by_username(&username)
        .await?
        .ok_or(ServerError::UserByUsernameNotFound(username))?;

    Ok(Json(user))
}
