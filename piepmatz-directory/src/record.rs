use piepmatz_common::model::{
    ModelValidationError,
    user::{MissingUsernameError, UserHandle, UserId, UserProfile},
};
use serde::{Deserialize, Serialize};

/// A user as the directory serves it. `username` is nullable on the wire;
/// records without one cannot become a [`UserProfile`].
#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct DirectoryUserRecord {
    pub id: String,
    pub username: Option<String>,
    pub profile_image_url: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub(crate) struct SessionVerifyRequest<'a> {
    pub token: &'a str,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub(crate) struct SessionRecord {
    pub user_id: String,
}

impl TryFrom<DirectoryUserRecord> for UserProfile {
    type Error = ModelValidationError;

    fn try_from(value: DirectoryUserRecord) -> Result<Self, Self::Error> {
        let id = UserId::new(value.id)?;
        let Some(username) = value.username else {
            return Err(MissingUsernameError(id).into());
        };

        Ok(Self {
            id,
            username: UserHandle::new(username)?,
            profile_image_url: value.profile_image_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::DirectoryUserRecord;
    use piepmatz_common::model::user::UserProfile;

    fn record() -> DirectoryUserRecord {
        DirectoryUserRecord {
            id: "user_2NNEqL2nrIRdJ194ndJqAHwEfxC".to_string(),
            username: Some("ferris".to_string()),
            profile_image_url: "https://images.example.com/ferris.png".to_string(),
        }
    }

    #[test]
    fn complete_record_converts() {
        let profile = UserProfile::try_from(record()).unwrap();

        assert_eq!(profile.id.get(), "user_2NNEqL2nrIRdJ194ndJqAHwEfxC");
        assert_eq!(profile.username.get(), "ferris");
        assert_eq!(
            profile.profile_image_url,
            "https://images.example.com/ferris.png"
        );
    }

    #[test]
    fn missing_username_fails_conversion() {
        let mut record = record();
        record.username = None;

        assert!(UserProfile::try_from(record).is_err());
    }

    #[test]
    fn malformed_id_fails_conversion() {
        let mut record = record();
        record.id = "user id with spaces".to_string();

        assert!(UserProfile::try_from(record).is_err());
    }

    #[test]
    fn wire_record_deserializes_with_null_username() {
        let record: DirectoryUserRecord = serde_json::from_str(
            r#"{"id":"user_1","username":null,"profile_image_url":"https://images.example.com/1.png"}"#,
        )
        .unwrap();

        assert_eq!(record.username, None);
    }
}
