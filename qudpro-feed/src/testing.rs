//! Builders and collaborator doubles shared by the unit tests.

use crate::{
    memory::MemoryPostStore,
    source::{PersistedSource, SourceError, SyntheticSource},
};
use parking_lot::Mutex;
use qudpro_common::model::{
    Id,
    comment::Comment,
    post::{Author, Post, PostContent, PostDraft, PostMarker, PostOrigin, PostPatch},
};
use std::{collections::VecDeque, io, num::NonZeroUsize, sync::Arc};
use time::{Duration, macros::utc_datetime};
use tokio::sync::Notify;

pub(crate) fn id(id: u64) -> Id<PostMarker> {
    Id::from(id)
}

/// A post created `minutes` after a fixed reference time.
pub(crate) fn post_at(id: u64, minutes: u64) -> Post {
    Post {
        id: Id::from(id),
        author: Author {
            name: format!("author {id}"),
            role: "Photographer".to_owned(),
            avatar_url: format!("https://example.com/avatars/{id}.jpg"),
        },
        content: PostContent {
            title: format!("post {id}"),
            description: "A glimpse of the city".to_owned(),
            media_url: format!("https://example.com/media/{id}.jpg"),
            category: "Professional".to_owned(),
        },
        like_count: 0,
        comments: Vec::new(),
        created_at: utc_datetime!(2025-01-02 00:00) + Duration::minutes(minutes.cast_signed()),
        origin: PostOrigin::Persisted,
    }
}

/// Hands out queued batches, then numbered posts once the queue is empty.
#[derive(Debug, Default)]
pub(crate) struct ScriptedSynthetic {
    batches: Mutex<VecDeque<Result<Vec<Post>, SourceError>>>,
    generated: Mutex<u64>,
}

impl ScriptedSynthetic {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_batch(self, posts: Vec<Post>) -> Self {
        self.batches.lock().push_back(Ok(posts));
        self
    }

    pub(crate) fn failing(self) -> Self {
        self.batches
            .lock()
            .push_back(Err(SourceError::unavailable(io::Error::other("generator down"))));
        self
    }
}

impl SyntheticSource for ScriptedSynthetic {
    async fn generate(&self, count: NonZeroUsize) -> Result<Vec<Post>, SourceError> {
        let call = {
            let mut generated = self.generated.lock();
            *generated += 1;
            *generated
        };

        if let Some(batch) = self.batches.lock().pop_front() {
            return batch;
        }

        Ok((0..count.get() as u64)
            .map(|n| post_at(9000 + call * 100 + n, 0))
            .collect())
    }
}

/// Lets the first calls through with an empty batch and blocks every later
/// `generate` call until [`GatedSynthetic::open`] is called.
#[derive(Clone, Debug, Default)]
pub(crate) struct GatedSynthetic {
    passes: Arc<Mutex<usize>>,
    gate: Arc<Notify>,
    started: Arc<Notify>,
}

impl GatedSynthetic {
    pub(crate) fn passing(passes: usize) -> Self {
        Self {
            passes: Arc::new(Mutex::new(passes)),
            ..Self::default()
        }
    }

    pub(crate) fn open(&self) {
        self.gate.notify_waiters();
    }

    pub(crate) async fn wait_started(&self) {
        self.started.notified().await;
    }
}

impl SyntheticSource for GatedSynthetic {
    async fn generate(&self, _count: NonZeroUsize) -> Result<Vec<Post>, SourceError> {
        {
            let mut passes = self.passes.lock();
            if *passes > 0 {
                *passes -= 1;
                return Ok(Vec::new());
            }
        }

        let opened = self.gate.notified();
        self.started.notify_one();
        opened.await;
        Ok(vec![post_at(1, 0)])
    }
}

/// A persisted source that cannot be reached.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct UnavailableStore;

impl UnavailableStore {
    fn error() -> SourceError {
        SourceError::unavailable(io::Error::other("connection refused"))
    }
}

impl PersistedSource for UnavailableStore {
    async fn list(&self, _limit: NonZeroUsize) -> Result<Vec<Post>, SourceError> {
        Err(Self::error())
    }

    async fn create(&self, _draft: PostDraft) -> Result<Post, SourceError> {
        Err(Self::error())
    }

    async fn update(&self, _id: Id<PostMarker>, _patch: PostPatch) -> Result<Post, SourceError> {
        Err(Self::error())
    }

    async fn delete(&self, _id: Id<PostMarker>) -> Result<(), SourceError> {
        Err(Self::error())
    }

    async fn add_comment(&self, _id: Id<PostMarker>, _comment: Comment) -> Result<(), SourceError> {
        Err(Self::error())
    }
}

/// A memory store whose next `list` call, once armed with
/// [`GatedStore::hold_next_list`], reads the posts and then waits for
/// [`GatedStore::release`] before returning them.
#[derive(Debug)]
pub(crate) struct GatedStore {
    store: MemoryPostStore,
    hold_next: Mutex<bool>,
    gate: Notify,
    listed: Notify,
}

impl GatedStore {
    pub(crate) fn new(store: MemoryPostStore) -> Self {
        Self {
            store,
            hold_next: Mutex::new(false),
            gate: Notify::new(),
            listed: Notify::new(),
        }
    }

    pub(crate) fn store(&self) -> &MemoryPostStore {
        &self.store
    }

    pub(crate) fn hold_next_list(&self) {
        *self.hold_next.lock() = true;
    }

    pub(crate) fn release(&self) {
        self.gate.notify_one();
    }

    /// Resolves once a held `list` call has read its posts.
    pub(crate) async fn wait_listed(&self) {
        self.listed.notified().await;
    }
}

impl PersistedSource for GatedStore {
    async fn list(&self, limit: NonZeroUsize) -> Result<Vec<Post>, SourceError> {
        let posts = self.store.list(limit).await;
        let hold = std::mem::take(&mut *self.hold_next.lock());
        if hold {
            let released = self.gate.notified();
            self.listed.notify_one();
            released.await;
        }
        posts
    }

    async fn create(&self, draft: PostDraft) -> Result<Post, SourceError> {
        self.store.create(draft).await
    }

    async fn update(&self, id: Id<PostMarker>, patch: PostPatch) -> Result<Post, SourceError> {
        self.store.update(id, patch).await
    }

    async fn delete(&self, id: Id<PostMarker>) -> Result<(), SourceError> {
        self.store.delete(id).await
    }

    async fn add_comment(&self, id: Id<PostMarker>, comment: Comment) -> Result<(), SourceError> {
        self.store.add_comment(id, comment).await
    }
}
