//! Like state of the current viewer.
//!
//! Kept apart from the posts themselves: liking never touches a post's
//! `like_count`, and ids of posts that have since left the feed may stay in
//! the set.

use qudpro_common::model::{Id, post::PostMarker};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Liked,
    Unliked,
}

impl Reaction {
    #[must_use]
    pub fn is_liked(self) -> bool {
        self == Reaction::Liked
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ReactionTracker {
    liked: HashSet<Id<PostMarker>>,
}

impl ReactionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: Id<PostMarker>) -> Reaction {
        if self.liked.remove(&id) {
            Reaction::Unliked
        } else {
            self.liked.insert(id);
            Reaction::Liked
        }
    }

    #[must_use]
    pub fn is_liked(&self, id: Id<PostMarker>) -> bool {
        self.liked.contains(&id)
    }

    #[must_use]
    pub fn liked_count(&self) -> usize {
        self.liked.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        reaction::{Reaction, ReactionTracker},
        testing::id,
    };

    #[test]
    fn toggle_likes_then_unlikes() {
        let mut tracker = ReactionTracker::new();

        assert_eq!(tracker.toggle(id(5)), Reaction::Liked);
        assert!(tracker.is_liked(id(5)));
        assert_eq!(tracker.toggle(id(5)), Reaction::Unliked);
        assert!(!tracker.is_liked(id(5)));
    }

    #[test]
    fn double_toggle_restores_previous_state() {
        let mut tracker = ReactionTracker::new();
        tracker.toggle(id(1));

        for post_id in [id(1), id(2)] {
            let before = tracker.is_liked(post_id);
            tracker.toggle(post_id);
            tracker.toggle(post_id);
            assert_eq!(tracker.is_liked(post_id), before);
        }
        assert_eq!(tracker.liked_count(), 1);
    }
}
