//! Outbound notifications of the feed.
//!
//! Two channels are kept: a revision counter that moves on every change of the
//! snapshot or the like state, for whoever renders the feed, and a stream of
//! discrete [`FeedSignal`]s for whoever tells the viewer what happened.

use qudpro_common::model::{Id, post::PostMarker};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::trace;

pub const SIGNAL_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedSignal {
    FeedLoaded { posts: usize },
    PostInjected { id: Id<PostMarker> },
    LikeToggled { id: Id<PostMarker>, liked: bool },
    CommentAdded { id: Id<PostMarker> },
    PostEdited { id: Id<PostMarker> },
    PostDeleted { id: Id<PostMarker> },
    LoadPartialFailure { source: SourceKind },
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Persisted,
    Synthetic,
}

#[derive(Debug)]
pub struct Notifier {
    revision: watch::Sender<u64>,
    signals: broadcast::Sender<FeedSignal>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);

        Self { revision, signals }
    }

    /// Bumps the revision and publishes `signal`. Having no listeners is fine.
    pub fn changed(&self, signal: FeedSignal) {
        self.revision.send_modify(|revision| *revision += 1);
        self.signal(signal);
    }

    /// Publishes `signal` without touching the revision.
    pub fn signal(&self, signal: FeedSignal) {
        trace!(?signal, "Publishing feed signal");
        let _ = self.signals.send(signal);
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    #[must_use]
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    #[must_use]
    pub fn subscribe_signals(&self) -> broadcast::Receiver<FeedSignal> {
        self.signals.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
