use crate::record::{DirectoryUserRecord, SessionRecord, SessionVerifyRequest};
use piepmatz_common::model::{
    ModelValidationError,
    user::{UserHandle, UserId, UserProfile},
};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub type Result<T, E = DirectoryError> = std::result::Result<T, E>;

/// The directory caps batch lookups at this many users per request.
pub const USER_FETCH_LIMIT: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("The directory base URL is invalid: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("Error talking to the user directory: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("The user directory replied with status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("The user directory returned an invalid record: {0}")]
    Data(#[from] ModelValidationError),
}

/// Client for the external user-directory service, which also resolves
/// session tokens to caller ids.
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl DirectoryClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Batch-fetches raw user records by id, at most [`USER_FETCH_LIMIT`] per
    /// call. Records stay unconverted so callers can decide how to treat
    /// incomplete users.
    pub async fn fetch_users(&self, user_ids: &[UserId]) -> Result<Vec<DirectoryUserRecord>> {
        let mut url = self.base_url.join("users")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &USER_FETCH_LIMIT.to_string());
            for user_id in user_ids.iter().take(USER_FETCH_LIMIT) {
                query.append_pair("user_id", user_id.get());
            }
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = check_status(response)?;

        Ok(response.json().await?)
    }

    pub async fn fetch_user_by_username(
        &self,
        username: &UserHandle,
    ) -> Result<Option<UserProfile>> {
        let mut url = self.base_url.join("users")?;
        url.query_pairs_mut()
            .append_pair("username", username.get());

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = check_status(response)?;

        let records: Vec<DirectoryUserRecord> = response.json().await?;
        let profile = records
            .into_iter()
            .next()
            .map(UserProfile::try_from)
            .transpose()?;
        Ok(profile)
    }

    /// Resolves a session token to the caller's user id. `None` means the
    /// directory rejected the token.
    pub async fn verify_session(&self, token: &str) -> Result<Option<UserId>> {
        let url = self.base_url.join("sessions/verify")?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&SessionVerifyRequest { token })
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND
        ) {
            return Ok(None);
        }
        let response = check_status(response)?;

        let record: SessionRecord = response.json().await?;
        let user_id = UserId::new(record.user_id).map_err(ModelValidationError::from)?;
        Ok(Some(user_id))
    }
}

fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(DirectoryError::UnexpectedStatus(response.status()))
    }
}
