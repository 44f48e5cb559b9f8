use piepmatz_common::model::{
    ModelValidationError,
    post::{Post, PostContent},
    user::UserId,
};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub author_id: String,
    pub content: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author_id: UserId::new(value.author_id)?,
            content: PostContent::new(value.content)?,
            created_at: value.created_at,
        })
    }
}
