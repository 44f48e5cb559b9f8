use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use piepmatz_common::model::{
    Id,
    post::{InvalidPostContentError, PostMarker},
    user::UserHandle,
};
use piepmatz_db::client::{DbClient, DbError};
use piepmatz_directory::client::{DirectoryClient, DirectoryError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod authors;
mod json;
mod rate_limit;
mod routes;

pub use rate_limit::{RATE_LIMIT_KEY_PREFIX, RateLimiter};
use rate_limit::RateLimitError;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub directory: Arc<DirectoryClient>,
    pub rate_limiter: RateLimiter,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The session token was rejected by the user directory")]
    InvalidSessionToken,
    #[error("Post content was rejected: {0}")]
    InvalidPostContent(#[from] InvalidPostContentError),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    RateLimitStore(#[from] RateLimitError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with username {0} was not found.")]
    UserByUsernameNotFound(UserHandle),
    #[error("The directory resolved no author for post {0}")]
    AuthorNotFound(Id<PostMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByUsernameNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidSessionToken => StatusCode::UNAUTHORIZED,
            ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidPostContent(_) => StatusCode::BAD_REQUEST,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::Directory(_)
            | ServerError::RateLimitStore(_)
            | ServerError::AuthorNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message exposed in the response body. Internal failures collapse
    /// into a generic message; details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => "Not found".to_owned(),
            ServerError::PostByIdNotFound(_) => "Post not found".to_owned(),
            ServerError::UserByUsernameNotFound(_) => "User not found".to_owned(),
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                "Missing authorization header".to_owned()
            }
            ServerError::InvalidAuthorizationHeader(_) => {
                "Invalid authorization header".to_owned()
            }
            ServerError::InvalidSessionToken => "Invalid session token".to_owned(),
            ServerError::JsonRejection(rejection) => rejection.body_text(),
            ServerError::InvalidPostContent(error) => error.to_string(),
            ServerError::RateLimitExceeded => "Rate limit exceeded".to_owned(),
            ServerError::AuthorNotFound(_) => "Author for post not found".to_owned(),
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::Directory(_)
            | ServerError::RateLimitStore(_) => "Internal server error".to_owned(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
            message: self.public_message(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::ServerError;
    use axum::http::StatusCode;
    use piepmatz_common::model::{Id, post::InvalidPostContentError, user::UserHandle};

    #[test]
    fn not_found_errors_map_to_404() {
        let error = ServerError::PostByIdNotFound(Id::from(1_u64));
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.public_message(), "Post not found");

        let username = UserHandle::new("ferris".to_string()).unwrap();
        let error = ServerError::UserByUsernameNotFound(username);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.public_message(), "User not found");
    }

    #[test]
    fn rate_limit_maps_to_429() {
        let error = ServerError::RateLimitExceeded;
        assert_eq!(error.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(error.public_message(), "Rate limit exceeded");
    }

    #[test]
    fn validation_errors_keep_their_message() {
        let error = ServerError::InvalidPostContent(InvalidPostContentError::NotEmoji);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.public_message(), "Only emojis are allowed");
    }

    #[test]
    fn unresolved_authors_are_internal_with_a_specific_message() {
        let error = ServerError::AuthorNotFound(Id::from(1_u64));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.public_message(), "Author for post not found");
    }

    #[test]
    fn rejected_sessions_are_unauthorized() {
        let error = ServerError::InvalidSessionToken;
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
    }
}
