use crate::model::{
    Id,
    user::{UserId, UserProfile},
};
use serde::{Deserialize, Deserializer, Serialize, de::Error};
use thiserror::Error;
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

pub const POST_CONTENT_MAX_EMOJIS: usize = 280;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A stored status update. Immutable once created.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author_id: UserId,
    pub content: PostContent,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A post joined with its directory author, assembled per request.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: UserProfile,
}

/// Message body of a post: between 1 and 280 emojis, nothing else.
///
/// Length counts extended grapheme clusters, so a ZWJ sequence or a flag
/// is a single emoji.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostContent(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostContentError {
    #[error("Type minimum 1 emoji")]
    Empty,
    #[error("Maximum {} emojis are allowed", POST_CONTENT_MAX_EMOJIS)]
    TooManyEmojis,
    #[error("Only emojis are allowed")]
    NotEmoji,
}

impl PostContent {
    pub fn new(content: String) -> Result<Self, InvalidPostContentError> {
        let mut emoji_count = 0_usize;
        for grapheme in content.graphemes(true) {
            if emojis::get(grapheme).is_none() {
                return Err(InvalidPostContentError::NotEmoji);
            }
            emoji_count += 1;
        }

        if emoji_count == 0 {
            return Err(InvalidPostContentError::Empty);
        }
        if emoji_count > POST_CONTENT_MAX_EMOJIS {
            return Err(InvalidPostContentError::TooManyEmojis);
        }

        Ok(Self(content))
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

impl<'de> Deserialize<'de> for PostContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostContent::new(inner).map_err(Error::custom)
    }
}
