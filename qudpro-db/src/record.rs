use qudpro_common::model::{
    ModelValidationError,
    comment::{Comment, CommentText},
    post::{Author, Post, PostContent, PostOrigin},
};
use sqlx::FromRow;
use time::{PrimitiveDateTime, UtcDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub author_name: String,
    pub author_role: String,
    pub author_avatar_url: String,
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub category: String,
    pub like_count: i64,
    pub created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub post_snowflake: i64,
    pub author: String,
    pub text: String,
    pub created_at: PrimitiveDateTime,
}

pub(crate) fn to_primitive(value: UtcDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(value.date(), value.time())
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            author: value.author,
            text: CommentText::new(value.text)?,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl PostRecord {
    /// Builds the post, attaching `comments` which must already be ordered
    /// most recent first.
    pub(crate) fn into_post(self, comments: Vec<Comment>) -> Result<Post, ModelValidationError> {
        Ok(Post {
            id: self.post_snowflake.cast_unsigned().into(),
            author: Author {
                name: self.author_name,
                role: self.author_role,
                avatar_url: self.author_avatar_url,
            },
            content: PostContent {
                title: self.title,
                description: self.description,
                media_url: self.media_url,
                category: self.category,
            },
            like_count: u64::try_from(self.like_count)?,
            comments,
            created_at: self.created_at.as_utc(),
            origin: PostOrigin::Persisted,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{CommentRecord, PostRecord};
    use qudpro_common::model::{ModelValidationError, comment::Comment};
    use time::macros::datetime;

    fn record(like_count: i64) -> PostRecord {
        PostRecord {
            post_snowflake: 42,
            author_name: "Mohamed Kamal".to_owned(),
            author_role: "Tech Photographer".to_owned(),
            author_avatar_url: "https://example.com/man.jpg".to_owned(),
            title: "Tech Hub".to_owned(),
            description: "Inside Egypt's growing tech ecosystem".to_owned(),
            media_url: "https://example.com/office.jpg".to_owned(),
            category: "Technology".to_owned(),
            like_count,
            created_at: datetime!(2025-02-01 08:00),
        }
    }

    #[test]
    fn converts_post_record() {
        let post = record(342).into_post(Vec::new()).unwrap();

        assert_eq!(u64::from(post.id), 42);
        assert_eq!(post.like_count, 342);
        assert_eq!(post.author.role, "Tech Photographer");
        assert_eq!(post.created_at, time::macros::utc_datetime!(2025-02-01 08:00));
    }

    #[test]
    fn rejects_negative_like_count() {
        assert!(matches!(
            record(-1).into_post(Vec::new()),
            Err(ModelValidationError::LikeCount(_))
        ));
    }

    #[test]
    fn rejects_blank_comment() {
        let comment = CommentRecord {
            post_snowflake: 42,
            author: "Sara Ahmed".to_owned(),
            text: "  ".to_owned(),
            created_at: datetime!(2025-02-01 09:00),
        };

        assert!(Comment::try_from(comment).is_err());
    }
}
