//! In-memory persisted source for development and tests.

use crate::source::{PersistedSource, SourceError};
use parking_lot::Mutex;
use qudpro_common::{
    model::{
        Id, IdIssuer, QudproSnowflakeGenerator,
        comment::Comment,
        post::{Post, PostDraft, PostMarker, PostOrigin, PostPatch},
    },
    snowflake::WorkerId,
};
use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashSet},
    num::NonZeroUsize,
};
use time::UtcDateTime;
use tracing::debug;

#[derive(Debug)]
pub struct MemoryPostStore {
    posts: Mutex<BTreeMap<Id<PostMarker>, Post>>,
    read_only: Mutex<HashSet<Id<PostMarker>>>,
    snowflake_generator: Mutex<QudproSnowflakeGenerator>,
}

impl MemoryPostStore {
    #[must_use]
    pub fn new(worker_id: WorkerId) -> Self {
        Self {
            posts: Mutex::new(BTreeMap::new()),
            read_only: Mutex::new(HashSet::new()),
            snowflake_generator: Mutex::new(IdIssuer::PersistedStore.generator(worker_id)),
        }
    }

    /// Creates a store already holding `posts`, keeping their ids.
    #[must_use]
    pub fn with_posts(worker_id: WorkerId, posts: impl IntoIterator<Item = Post>) -> Self {
        let store = Self::new(worker_id);
        store
            .posts
            .lock()
            .extend(posts.into_iter().map(|post| (post.id, post)));
        store
    }

    /// Makes every later update or delete of `id` fail, the way a store
    /// refuses changes to posts the viewer does not own.
    pub fn set_read_only(&self, id: Id<PostMarker>) {
        self.read_only.lock().insert(id);
    }

    #[must_use]
    pub fn contains(&self, id: Id<PostMarker>) -> bool {
        self.posts.lock().contains_key(&id)
    }

    fn check_writable(&self, id: Id<PostMarker>) -> Result<(), SourceError> {
        if self.read_only.lock().contains(&id) {
            return Err(SourceError::Rejected {
                id,
                reason: "post is read-only".to_owned(),
            });
        }
        Ok(())
    }
}

impl PersistedSource for MemoryPostStore {
    async fn list(&self, limit: NonZeroUsize) -> Result<Vec<Post>, SourceError> {
        let mut posts: Vec<Post> = self.posts.lock().values().cloned().collect();
        posts.sort_by_key(|post| Reverse(post.created_at));
        posts.truncate(limit.get());
        Ok(posts)
    }

    async fn create(&self, draft: PostDraft) -> Result<Post, SourceError> {
        let id = self.snowflake_generator.lock().generate().into();
        let post = Post {
            id,
            author: draft.author,
            content: draft.content,
            like_count: 0,
            comments: Vec::new(),
            created_at: UtcDateTime::now(),
            origin: PostOrigin::Persisted,
        };

        debug!(%id, "Storing new post in memory");
        self.posts.lock().insert(id, post.clone());
        Ok(post)
    }

    async fn update(&self, id: Id<PostMarker>, patch: PostPatch) -> Result<Post, SourceError> {
        self.check_writable(id)?;

        let mut posts = self.posts.lock();
        let post = posts.get_mut(&id).ok_or(SourceError::NotFound(id))?;
        patch.apply_to(&mut post.content);
        Ok(post.clone())
    }

    async fn delete(&self, id: Id<PostMarker>) -> Result<(), SourceError> {
        self.check_writable(id)?;

        self.posts
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(SourceError::NotFound(id))
    }

    async fn add_comment(&self, id: Id<PostMarker>, comment: Comment) -> Result<(), SourceError> {
        let mut posts = self.posts.lock();
        let post = posts.get_mut(&id).ok_or(SourceError::NotFound(id))?;
        post.comments.insert(0, comment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        memory::MemoryPostStore,
        source::{PersistedSource, SourceError},
        testing::{id, post_at},
    };
    use qudpro_common::{
        model::{
            comment::{Comment, CommentText},
            post::{Author, PostContent, PostDraft, PostPatch},
        },
        snowflake::WorkerId,
    };
    use std::num::NonZeroUsize;
    use time::macros::utc_datetime;

    fn limit(limit: usize) -> NonZeroUsize {
        NonZeroUsize::new(limit).unwrap()
    }

    fn store() -> MemoryPostStore {
        MemoryPostStore::with_posts(WorkerId::new(1).unwrap(), [post_at(1, 10), post_at(2, 20)])
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids() {
        let store = store();
        let draft = PostDraft {
            author: Author::default(),
            content: PostContent {
                title: "Creative Space".to_owned(),
                ..PostContent::default()
            },
        };

        let first = store.create(draft.clone()).await.unwrap();
        let second = store.create(draft).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.list(limit(10)).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn list_returns_the_newest_posts_first() {
        let store = MemoryPostStore::with_posts(
            WorkerId::new(1).unwrap(),
            [post_at(1, 30), post_at(2, 10), post_at(3, 20)],
        );

        let posts = store.list(limit(2)).await.unwrap();

        let ids: Vec<u64> = posts.iter().map(|post| post.id.into()).collect();
        assert_eq!(ids, [1, 3]);
    }

    #[tokio::test]
    async fn comments_are_kept_newest_first() {
        let store = store();
        let comment = |text: &str| Comment {
            author: "Sara Ahmed".to_owned(),
            text: CommentText::new(text.to_owned()).unwrap(),
            created_at: utc_datetime!(2025-01-03 09:00),
        };

        store.add_comment(id(1), comment("first")).await.unwrap();
        store.add_comment(id(1), comment("second")).await.unwrap();

        let posts = store.list(limit(10)).await.unwrap();
        let post = posts.iter().find(|post| post.id == id(1)).unwrap();
        assert_eq!(post.comments, [comment("second"), comment("first")]);
        assert!(matches!(
            store.add_comment(id(9), comment("lost")).await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_applies_patch() {
        let store = store();
        let patch = PostPatch {
            category: Some("Design".to_owned()),
            ..PostPatch::default()
        };

        let updated = store.update(id(2), patch.clone()).await.unwrap();

        assert_eq!(updated.content.category, "Design");
        assert!(matches!(
            store.update(id(9), patch).await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn read_only_posts_reject_changes() {
        let store = store();
        store.set_read_only(id(1));

        assert!(matches!(
            store.delete(id(1)).await,
            Err(SourceError::Rejected { .. })
        ));
        assert!(store.contains(id(1)));

        store.delete(id(2)).await.unwrap();
        assert!(!store.contains(id(2)));
        assert!(matches!(
            store.delete(id(2)).await,
            Err(SourceError::NotFound(_))
        ));
    }
}
