use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::Display;
use thiserror::Error;

pub const USER_HANDLE_MAX_LEN: usize = 50;
pub const USER_ID_MAX_LEN: usize = 64;

/// An opaque user id assigned by the external user directory.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The user id is invalid: {0}")]
pub struct InvalidUserIdError(String);

impl UserId {
    pub fn new(id: String) -> Result<Self, InvalidUserIdError> {
        let in_range = !id.is_empty() && id.len() <= USER_ID_MAX_LEN;
        if in_range && id.chars().all(|c| c.is_ascii_graphic()) {
            Ok(UserId(id))
        } else {
            Err(InvalidUserIdError(id))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserId::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"UserId"))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserHandle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The user handle is invalid: {0}")]
pub struct InvalidUserHandleError(String);

impl UserHandle {
    pub fn new(handle: String) -> Result<Self, InvalidUserHandleError> {
        let length = handle.chars().count();
        if length > 0 && length <= USER_HANDLE_MAX_LEN {
            Ok(UserHandle(handle))
        } else {
            Err(InvalidUserHandleError(handle))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for UserHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for UserHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserHandle::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"UserHandle"))
    }
}

/// The externally hosted author profile, as exposed to API consumers.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: UserHandle,
    pub profile_image_url: String,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The directory user {0} has no username")]
pub struct MissingUsernameError(pub UserId);

#[cfg(test)]
mod tests {
    use crate::model::user::{USER_HANDLE_MAX_LEN, USER_ID_MAX_LEN, UserHandle, UserId};

    #[test]
    fn accepts_directory_shaped_user_ids() {
        assert!(UserId::new("user_2NNEqL2nrIRdJ194ndJqAHwEfxC".to_string()).is_ok());
        assert!(UserId::new("a".to_string()).is_ok());
        assert!(UserId::new("a".repeat(USER_ID_MAX_LEN)).is_ok());
    }

    #[test]
    fn rejects_malformed_user_ids() {
        assert!(UserId::new(String::new()).is_err());
        assert!(UserId::new("a".repeat(USER_ID_MAX_LEN + 1)).is_err());
        assert!(UserId::new("user id".to_string()).is_err());
        assert!(UserId::new("usér".to_string()).is_err());
    }

    #[test]
    fn handle_length_limits() {
        assert!(UserHandle::new("ferris".to_string()).is_ok());
        assert!(UserHandle::new("a".repeat(USER_HANDLE_MAX_LEN)).is_ok());
        assert!(UserHandle::new(String::new()).is_err());
        assert!(UserHandle::new("a".repeat(USER_HANDLE_MAX_LEN + 1)).is_err());
    }
}
