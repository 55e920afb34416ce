use crate::source::SourceError;
use qudpro_common::model::{Id, post::PostMarker};
use thiserror::Error;

pub type Result<T, E = FeedError> = std::result::Result<T, E>;

/// Failures of feed mutations. None of them leave the snapshot modified.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Post with id {0} is not in the feed.")]
    NotFound(Id<PostMarker>),
    #[error("Post with id {0} is generated content and cannot be changed.")]
    NotPersisted(Id<PostMarker>),
    #[error("Deleting post {id} was rejected: {source}")]
    DeleteRejected {
        id: Id<PostMarker>,
        source: SourceError,
    },
    #[error("Storing a comment on post {id} was rejected: {source}")]
    CommentRejected {
        id: Id<PostMarker>,
        source: SourceError,
    },
    #[error("Updating post {id} was rejected: {source}")]
    UpdateRejected {
        id: Id<PostMarker>,
        source: SourceError,
    },
}
