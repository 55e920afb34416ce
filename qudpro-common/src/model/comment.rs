use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const COMMENT_TEXT_MAX_LEN: usize = 2000;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub author: String,
    pub text: CommentText,
    #[serde(with = "crate::timestamp")]
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentText(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The comment text is empty or too long: {0:?}")]
pub struct InvalidCommentTextError(String);

impl CommentText {
    pub fn new(text: String) -> Result<Self, InvalidCommentTextError> {
        if !text.trim().is_empty() && text.chars().count() <= COMMENT_TEXT_MAX_LEN {
            Ok(CommentText(text))
        } else {
            Err(InvalidCommentTextError(text))
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

impl<'de> Deserialize<'de> for CommentText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommentText::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"CommentText"))
    }
}
