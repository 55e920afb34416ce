//! The bounded in-memory snapshot every read and write of the feed goes
//! through.

use qudpro_common::model::{
    Id,
    comment::Comment,
    post::{Post, PostMarker},
};
use std::num::NonZeroUsize;

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct BoundedCache {
    capacity: NonZeroUsize,
    posts: Vec<Post>,
}

impl BoundedCache {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            posts: Vec::with_capacity(capacity.get()),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    #[must_use]
    pub fn snapshot(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: Id<PostMarker>) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: Id<PostMarker>) -> bool {
        self.get(id).is_some()
    }

    /// Replaces the snapshot wholesale. `snapshot` is expected to be ordered
    /// most recent first; entries beyond the capacity are dropped from the end.
    pub fn initialize(&mut self, mut snapshot: Vec<Post>) -> &[Post] {
        snapshot.truncate(self.capacity.get());
        self.posts = snapshot;
        &self.posts
    }

    /// Puts `post` first regardless of its timestamp and evicts from the tail
    /// down to the capacity.
    ///
    /// Does not check for duplicate ids: the caller must hand in an id that is
    /// not already part of the snapshot.
    pub fn inject(&mut self, post: Post) -> &[Post] {
        self.posts.insert(0, post);
        self.posts.truncate(self.capacity.get());
        &self.posts
    }

    /// Returns whether a post was removed.
    pub fn remove(&mut self, id: Id<PostMarker>) -> bool {
        let before = self.posts.len();
        self.posts.retain(|post| post.id != id);
        self.posts.len() != before
    }

    /// Prepends `comment` to the post's comments. Returns whether the post was
    /// found.
    pub fn update_comments(&mut self, id: Id<PostMarker>, comment: Comment) -> bool {
        match self.posts.iter_mut().find(|post| post.id == id) {
            Some(post) => {
                post.comments.insert(0, comment);
                true
            }
            None => false,
        }
    }

    /// Swaps in an edited version of a post at its current position.
    ///
    /// Comments added through the feed are kept, the origin is left as the
    /// feed stamped it.
    pub fn replace_content(&mut self, id: Id<PostMarker>, edited: Post) -> Option<&Post> {
        let post = self.posts.iter_mut().find(|post| post.id == id)?;
        post.author = edited.author;
        post.content = edited.content;
        post.like_count = edited.like_count;
        Some(post)
    }
}
