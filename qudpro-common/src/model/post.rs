use crate::model::{Id, ModelValidationError, comment::Comment};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A single feed item.
///
/// `id` is assigned once by whichever source produced the post. `origin` is
/// stamped by the feed when the post enters it and decides whether the post
/// may be edited or deleted.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: Author,
    pub content: PostContent,
    pub like_count: u64,
    /// Most recent first.
    pub comments: Vec<Comment>,
    #[serde(with = "crate::timestamp")]
    pub created_at: UtcDateTime,
    pub origin: PostOrigin,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Author {
    pub name: String,
    pub role: String,
    pub avatar_url: String,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostContent {
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub category: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostOrigin {
    /// Authored by a user and owned by the persisted store.
    #[default]
    Persisted,
    /// Filler content generated for this feed only.
    Synthetic,
}

impl PostOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PostOrigin::Persisted => "persisted",
            PostOrigin::Synthetic => "synthetic",
        }
    }
}

impl Display for PostOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostOrigin {
    type Err = ModelValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "persisted" => Ok(PostOrigin::Persisted),
            "synthetic" => Ok(PostOrigin::Synthetic),
            other => Err(ModelValidationError::PostOrigin(other.to_owned())),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostDraft {
    pub author: Author,
    pub content: PostContent,
}

/// Partial update of a post's content. `None` leaves a field unchanged.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub media_url: Option<String>,
    pub category: Option<String>,
}

impl PostPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.media_url.is_none()
            && self.category.is_none()
    }

    pub fn apply_to(self, content: &mut PostContent) {
        if let Some(title) = self.title {
            content.title = title;
        }
        if let Some(description) = self.description {
            content.description = description;
        }
        if let Some(media_url) = self.media_url {
            content.media_url = media_url;
        }
        if let Some(category) = self.category {
            content.category = category;
        }
    }
}
