use qudpro_common::model::{
    Id,
    comment::Comment,
    post::{Post, PostDraft, PostMarker, PostPatch},
};
use qudpro_db::client::DbClient;
use qudpro_feed::{PersistedSource, SourceError, memory::MemoryPostStore};
use std::num::NonZeroUsize;

/// The persisted source selected at startup.
#[derive(Debug)]
pub enum Store {
    Postgres(DbClient),
    Memory(MemoryPostStore),
}

impl PersistedSource for Store {
    async fn list(&self, limit: NonZeroUsize) -> Result<Vec<Post>, SourceError> {
        match self {
            Store::Postgres(db) => db.list(limit).await,
            Store::Memory(memory) => memory.list(limit).await,
        }
    }

    async fn create(&self, draft: PostDraft) -> Result<Post, SourceError> {
        match self {
            Store::Postgres(db) => db.create(draft).await,
            Store::Memory(memory) => memory.create(draft).await,
        }
    }

    async fn update(&self, id: Id<PostMarker>, patch: PostPatch) -> Result<Post, SourceError> {
        match self {
            Store::Postgres(db) => db.update(id, patch).await,
            Store::Memory(memory) => memory.update(id, patch).await,
        }
    }

    async fn delete(&self, id: Id<PostMarker>) -> Result<(), SourceError> {
        match self {
            Store::Postgres(db) => db.delete(id).await,
            Store::Memory(memory) => memory.delete(id).await,
        }
    }

    async fn add_comment(&self, id: Id<PostMarker>, comment: Comment) -> Result<(), SourceError> {
        match self {
            Store::Postgres(db) => db.add_comment(id, comment).await,
            Store::Memory(memory) => memory.add_comment(id, comment).await,
        }
    }
}
