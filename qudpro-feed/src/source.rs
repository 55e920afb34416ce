//! Contracts of the two collaborators the feed reads posts from.

use qudpro_common::model::{
    Id,
    comment::Comment,
    post::{Post, PostDraft, PostMarker, PostPatch},
};
use std::{future::Future, num::NonZeroUsize};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("The source is unavailable: {0}")]
    Unavailable(#[source] BoxError),
    #[error("The source rejected the change to post {id}: {reason}")]
    Rejected { id: Id<PostMarker>, reason: String },
    #[error("Post with id {0} does not exist in the source.")]
    NotFound(Id<PostMarker>),
}

impl SourceError {
    pub fn unavailable(err: impl Into<BoxError>) -> Self {
        SourceError::Unavailable(err.into())
    }
}

/// Durable store of user-authored posts.
///
/// The feed reads its newest posts and forwards comments, edits and deletes
/// to it. Implementations are the source of truth: a change is only reflected
/// in the feed after the store confirmed it.
pub trait PersistedSource {
    /// The `limit` most recent posts, newest first, with their comments.
    fn list(
        &self,
        limit: NonZeroUsize,
    ) -> impl Future<Output = Result<Vec<Post>, SourceError>> + Send;

    fn create(&self, draft: PostDraft) -> impl Future<Output = Result<Post, SourceError>> + Send;

    fn update(
        &self,
        id: Id<PostMarker>,
        patch: PostPatch,
    ) -> impl Future<Output = Result<Post, SourceError>> + Send;

    fn delete(&self, id: Id<PostMarker>) -> impl Future<Output = Result<(), SourceError>> + Send;

    /// Stores `comment` as the most recent comment of post `id`.
    fn add_comment(
        &self,
        id: Id<PostMarker>,
        comment: Comment,
    ) -> impl Future<Output = Result<(), SourceError>> + Send;
}

/// Generator of filler posts.
///
/// Returned posts must be fully populated. Their ids are placeholders when
/// the feed injects them: it assigns fresh ones.
pub trait SyntheticSource {
    fn generate(
        &self,
        count: NonZeroUsize,
    ) -> impl Future<Output = Result<Vec<Post>, SourceError>> + Send;
}
