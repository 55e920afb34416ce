//! The feed as seen by one viewer: the bounded snapshot, the viewer's likes
//! and every operation that reads or changes them.

use crate::{
    cache::BoundedCache,
    config::FeedConfig,
    error::{FeedError, Result},
    merge::merge,
    reaction::{Reaction, ReactionTracker},
    signal::{FeedSignal, Notifier, SourceKind},
    source::{PersistedSource, SourceError, SyntheticSource},
};
use parking_lot::Mutex;
use qudpro_common::{
    model::{
        Id, IdIssuer, QudproSnowflakeGenerator,
        comment::{Comment, CommentText},
        post::{Post, PostMarker, PostOrigin, PostPatch},
    },
    snowflake::WorkerId,
};
use serde::Serialize;
use std::num::NonZeroUsize;
use time::UtcDateTime;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of [`FeedEngine::load`]. Loading never fails as a whole: a source
/// that could not be read simply contributes no posts.
#[derive(Debug)]
pub struct LoadReport {
    /// Size of the snapshot once the load finished.
    pub posts: usize,
    pub failures: Vec<(SourceKind, SourceError)>,
    /// `false` if a load started later had already been applied, in which
    /// case this one left the snapshot alone.
    pub applied: bool,
}

impl LoadReport {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct FeedEntry {
    pub post: Post,
    pub liked: bool,
}

/// A consistent read of the snapshot together with the viewer's likes.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct FeedView {
    pub loaded: bool,
    pub revision: u64,
    pub posts: Vec<FeedEntry>,
}

#[derive(Debug)]
struct FeedState {
    cache: BoundedCache,
    reactions: ReactionTracker,
    snowflake_generator: QudproSnowflakeGenerator,
    loaded: bool,
    loads_started: u64,
    /// Ticket of the most recent load that replaced the snapshot.
    load_applied: u64,
}

impl FeedState {
    /// Draws ids until one is not part of the snapshot.
    fn fresh_id(&mut self, now: UtcDateTime) -> Id<PostMarker> {
        loop {
            let candidate = self.snowflake_generator.generate_at(now).into();
            if !self.cache.contains(candidate) {
                return candidate;
            }
        }
    }
}

/// Owns all state of a feed view.
///
/// State changes happen inside a single critical section per operation, and
/// the lock is never held while a source is being awaited. Operations are
/// therefore applied atomically, in the order they acquire the lock.
#[derive(Debug)]
pub struct FeedEngine<P, S> {
    persisted: P,
    synthetic: S,
    config: FeedConfig,
    state: Mutex<FeedState>,
    notifier: Notifier,
}

impl<P, S> FeedEngine<P, S>
where
    P: PersistedSource + Sync,
    S: SyntheticSource + Sync,
{
    #[must_use]
    pub fn new(persisted: P, synthetic: S, config: FeedConfig, worker_id: WorkerId) -> Self {
        let state = FeedState {
            cache: BoundedCache::new(config.capacity),
            reactions: ReactionTracker::new(),
            snowflake_generator: IdIssuer::FeedInjection.generator(worker_id),
            loaded: false,
            loads_started: 0,
            load_applied: 0,
        };

        Self {
            persisted,
            synthetic,
            config,
            state: Mutex::new(state),
            notifier: Notifier::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    #[must_use]
    pub fn persisted(&self) -> &P {
        &self.persisted
    }

    /// Rebuilds the snapshot from both sources.
    ///
    /// Used for the initial load and whenever the persisted posts changed
    /// behind the feed's back. Posts injected since the last load are
    /// replaced by a fresh batch of generated ones.
    ///
    /// Overlapping loads are applied in the order they started. A load whose
    /// sources answer after those of a later load is discarded.
    pub async fn load(&self) -> LoadReport {
        let ticket = {
            let mut state = self.state.lock();
            state.loads_started += 1;
            state.loads_started
        };

        let (persisted, synthetic) = tokio::join!(
            self.persisted.list(self.config.capacity),
            self.synthetic.generate(self.config.initial_synthetic_count),
        );

        let mut failures = Vec::new();
        let persisted = collect_source(persisted, SourceKind::Persisted, &mut failures);
        let synthetic = collect_source(synthetic, SourceKind::Synthetic, &mut failures);
        let merged = merge(persisted, synthetic);

        let (posts, applied) = {
            let mut state = self.state.lock();
            if ticket < state.load_applied {
                (state.cache.len(), false)
            } else {
                let posts = state.cache.initialize(merged).len();
                state.loaded = true;
                state.load_applied = ticket;

                self.notifier.changed(FeedSignal::FeedLoaded { posts });
                for (source, _) in &failures {
                    self.notifier
                        .signal(FeedSignal::LoadPartialFailure { source: *source });
                }
                (posts, true)
            }
        };

        if applied {
            info!(posts, failed_sources = failures.len(), "Feed loaded");
        } else {
            debug!(ticket, "Discarded load overtaken by a newer one");
        }
        LoadReport {
            posts,
            failures,
            applied,
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Post> {
        self.state.lock().cache.snapshot().to_vec()
    }

    #[must_use]
    pub fn view(&self) -> FeedView {
        let state = self.state.lock();
        let posts = state
            .cache
            .snapshot()
            .iter()
            .map(|post| FeedEntry {
                liked: state.reactions.is_liked(post.id),
                post: post.clone(),
            })
            .collect();

        FeedView {
            loaded: state.loaded,
            revision: self.notifier.revision(),
            posts,
        }
    }

    #[must_use]
    pub fn is_liked(&self, id: Id<PostMarker>) -> bool {
        self.state.lock().reactions.is_liked(id)
    }

    /// Likes `id`, or unlikes it if it was liked. Works for any id, including
    /// posts no longer in the feed.
    pub fn toggle_like(&self, id: Id<PostMarker>) -> Reaction {
        let mut state = self.state.lock();
        let reaction = state.reactions.toggle(id);

        debug!(%id, ?reaction, "Toggled like");
        self.notifier.changed(FeedSignal::LikeToggled {
            id,
            liked: reaction.is_liked(),
        });
        reaction
    }

    /// Adds a comment to a post in the feed. Comments on persisted posts are
    /// stored at the source before they show up in the feed, so they survive
    /// a reload.
    pub async fn add_comment(
        &self,
        id: Id<PostMarker>,
        text: CommentText,
        author: String,
    ) -> Result<Comment> {
        let origin = self
            .state
            .lock()
            .cache
            .get(id)
            .map(|post| post.origin)
            .ok_or(FeedError::NotFound(id))?;

        let comment = Comment {
            author,
            text,
            created_at: UtcDateTime::now(),
        };

        let persisted = origin == PostOrigin::Persisted;
        if persisted {
            self.persisted
                .add_comment(id, comment.clone())
                .await
                .map_err(|source| {
                    warn!(%id, error = %source, "Persisted source rejected comment");
                    FeedError::CommentRejected { id, source }
                })?;
        }

        let mut state = self.state.lock();
        if state.cache.update_comments(id, comment.clone()) {
            self.notifier.changed(FeedSignal::CommentAdded { id });
        } else if persisted {
            // Evicted while the source was storing the comment.
            self.notifier.signal(FeedSignal::CommentAdded { id });
        } else {
            return Err(FeedError::NotFound(id));
        }

        debug!(%id, "Added comment");
        Ok(comment)
    }

    /// Deletes a persisted post at the source first and only then from the
    /// feed. A rejected delete leaves the feed untouched.
    pub async fn request_delete(&self, id: Id<PostMarker>) -> Result<()> {
        self.require_persisted(id)?;

        if let Err(source) = self.persisted.delete(id).await {
            warn!(%id, error = %source, "Persisted source rejected delete");
            return Err(FeedError::DeleteRejected { id, source });
        }

        let mut state = self.state.lock();
        if state.cache.remove(id) {
            self.notifier.changed(FeedSignal::PostDeleted { id });
        } else {
            // Evicted while the source was deleting it.
            self.notifier.signal(FeedSignal::PostDeleted { id });
        }

        info!(%id, "Deleted post");
        Ok(())
    }

    /// Applies `patch` at the persisted source and swaps the confirmed post
    /// into the feed at its current position.
    pub async fn edit_post(&self, id: Id<PostMarker>, patch: PostPatch) -> Result<Post> {
        self.require_persisted(id)?;

        let edited = self
            .persisted
            .update(id, patch)
            .await
            .map_err(|source| FeedError::UpdateRejected { id, source })?;

        let mut state = self.state.lock();
        let post = state
            .cache
            .replace_content(id, edited)
            .cloned()
            .ok_or(FeedError::NotFound(id))?;

        debug!(%id, "Edited post");
        self.notifier.changed(FeedSignal::PostEdited { id });
        Ok(post)
    }

    /// Asks the synthetic source for exactly one post to inject.
    pub(crate) async fn generate_injection(&self) -> Result<Post, SourceError> {
        self.synthetic
            .generate(NonZeroUsize::MIN)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::unavailable("synthetic source returned no post"))
    }

    /// Gives `post` a fresh id and puts it at the top of the feed, unless
    /// `token` was cancelled in the meantime.
    pub(crate) fn inject_synthetic(
        &self,
        mut post: Post,
        token: &CancellationToken,
    ) -> Option<Id<PostMarker>> {
        let state = &mut *self.state.lock();
        if token.is_cancelled() {
            debug!("Discarding synthetic post generated after cancellation");
            return None;
        }

        let id = state.fresh_id(UtcDateTime::now());
        post.id = id;
        post.origin = PostOrigin::Synthetic;
        state.cache.inject(post);

        debug!(%id, "Injected synthetic post");
        self.notifier.changed(FeedSignal::PostInjected { id });
        Some(id)
    }

    #[must_use]
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe_changes()
    }

    #[must_use]
    pub fn subscribe_signals(&self) -> broadcast::Receiver<FeedSignal> {
        self.notifier.subscribe_signals()
    }

    fn require_persisted(&self, id: Id<PostMarker>) -> Result<()> {
        let state = self.state.lock();
        match state.cache.get(id).map(|post| post.origin) {
            None => Err(FeedError::NotFound(id)),
            Some(PostOrigin::Synthetic) => Err(FeedError::NotPersisted(id)),
            Some(PostOrigin::Persisted) => Ok(()),
        }
    }
}

fn collect_source(
    result: Result<Vec<Post>, SourceError>,
    source: SourceKind,
    failures: &mut Vec<(SourceKind, SourceError)>,
) -> Vec<Post> {
    result.unwrap_or_else(|err| {
        warn!(?source, error = %err, "Feed source unavailable, loading without it");
        failures.push((source, err));
        Vec::new()
    })
}
