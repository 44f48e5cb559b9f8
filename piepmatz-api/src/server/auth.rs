use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use piepmatz_common::model::user::UserId;
use piepmatz_directory::client::DirectoryClient;
use std::sync::Arc;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// A caller whose bearer token the user directory accepted. Handlers that
/// take this extractor never see unauthenticated requests.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    id: UserId,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DirectoryClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?;

        let id = Arc::<DirectoryClient>::from_ref(state)
            .verify_session(header.token())
            .await?
            .ok_or(ServerError::InvalidSessionToken)?;

        Ok(Self { id })
    }
}
